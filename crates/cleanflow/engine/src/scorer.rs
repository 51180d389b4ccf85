//! Compliance scoring
//!
//! The score is the share of required steps completed. A procedure with
//! no required steps falls back to the share of all steps completed, and
//! a procedure with no steps at all is trivially compliant. Reporting
//! thresholds downstream depend on this exact three-way rule.

use cleanflow_types::{ProcedureInfo, StepId};
use std::collections::BTreeSet;

/// Score a set of completed steps against a procedure, in `[0, 100]`.
///
/// Completed ids that are not steps of the procedure are ignored.
pub fn score(procedure: &ProcedureInfo, completed: &BTreeSet<StepId>) -> f64 {
    let required = procedure.required_steps().count();
    if required > 0 {
        let completed_required = procedure
            .required_steps()
            .filter(|s| completed.contains(&s.id))
            .count();
        return percentage(completed_required, required);
    }

    let total = procedure.steps.len();
    if total == 0 {
        return 100.0;
    }

    let completed_total = procedure
        .steps
        .iter()
        .filter(|s| completed.contains(&s.id))
        .count();
    percentage(completed_total, total)
}

fn percentage(part: usize, whole: usize) -> f64 {
    (part as f64 / whole as f64 * 100.0).clamp(0.0, 100.0)
}
