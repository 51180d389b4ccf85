//! Run assembler: freezes a reviewed run into a [`CleaningRunRecord`]

use crate::collaborators::{Clock, IdGenerator};
use crate::scorer;
use cleanflow_types::{
    CleaningRunRecord, CompletedStepRecord, Operator, ProcedureRun, RunId, VerificationMethod,
};

/// Build the immutable record for a run.
///
/// One step record per completed step, in procedure order; steps never
/// ticked are left out. The compliance score is computed here once and
/// is never recomputed afterwards.
pub fn assemble(
    run: &ProcedureRun,
    operator: &Operator,
    ids: &dyn IdGenerator,
    clock: &dyn Clock,
) -> CleaningRunRecord {
    let run_id = RunId::new(ids.new_id());
    let end_time = clock.now();

    let steps: Vec<CompletedStepRecord> = run
        .procedure
        .steps
        .iter()
        .filter_map(|step| {
            let completed_at = run.progress.completed_at(&step.id)?;
            Some(CompletedStepRecord {
                id: ids.new_id(),
                step_id: step.id.clone(),
                name: step.name.clone(),
                completed_at,
                completed_by: operator.name.clone(),
                notes: run.progress.note(&step.id).map(str::to_string),
                checklist_items: step.checklist_items.clone(),
            })
        })
        .collect();

    let compliance_score = scorer::score(&run.procedure, &run.progress.completed_step_ids());

    tracing::debug!(
        run_id = %run_id,
        procedure_id = %run.procedure.id,
        steps = steps.len(),
        compliance_score,
        "Run record assembled"
    );

    CleaningRunRecord {
        id: run_id,
        procedure_id: run.procedure.id.clone(),
        procedure_name: run.procedure.name.clone(),
        operator_id: operator.id.clone(),
        operator_name: operator.name.clone(),
        area_id: run.scan.payload.area_id().clone(),
        area_name: run.scan.area_name().to_string(),
        start_time: run.started_at,
        end_time,
        verification_method: VerificationMethod::from(run.scan.payload.kind()),
        steps,
        compliance_score,
    }
}
