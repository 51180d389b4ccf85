//! Property tests: compliance score bounds, reset behaviour and
//! at-most-one submission in flight.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use cleanflow_engine::memory::{FixedClock, InMemoryCatalog, InMemoryRepository, SequentialIds};
use cleanflow_engine::scorer;
use cleanflow_engine::*;
use cleanflow_types::*;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

/// A procedure whose steps are `s0..sN`, each required or optional
fn arb_procedure() -> impl Strategy<Value = ProcedureInfo> {
    prop::collection::vec(any::<bool>(), 0..10).prop_map(|flags| {
        flags
            .into_iter()
            .enumerate()
            .fold(ProcedureInfo::new("p", "Procedure"), |p, (i, required)| {
                let id = format!("s{i}");
                let step = if required {
                    ProcedureStep::required(id, "Step")
                } else {
                    ProcedureStep::optional(id, "Step")
                };
                p.with_step(step)
            })
    })
}

/// Completed ids drawn from a wider range than any procedure has, so
/// foreign ids show up too
fn arb_completed() -> impl Strategy<Value = BTreeSet<StepId>> {
    prop::collection::btree_set(0usize..14, 0..14)
        .prop_map(|ids| ids.into_iter().map(|i| StepId::new(format!("s{i}"))).collect())
}

#[derive(Clone, Debug)]
enum Op {
    Complete(usize),
    Reopen(usize),
    Note(usize, String),
    Review,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..5).prop_map(Op::Complete),
        (0usize..5).prop_map(Op::Reopen),
        ((0usize..5), "[a-z ]{0,12}").prop_map(|(i, t)| Op::Note(i, t)),
        Just(Op::Review),
    ]
}

fn make_engine(procedure: ProcedureInfo) -> (WorkflowEngine, Arc<InMemoryRepository>) {
    let catalog = InMemoryCatalog::new()
        .with_area(AreaInfo::new("room-1", "Operating Room 1"))
        .with_procedure(procedure);
    let repo = Arc::new(InMemoryRepository::new());
    let collaborators = Collaborators::new(
        Arc::new(catalog),
        repo.clone(),
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
        )),
        Arc::new(SequentialIds::new("id")),
    );
    let engine = WorkflowEngine::new(
        collaborators,
        Operator::new("op-1", "Dana"),
        EngineConfig::default(),
    );
    (engine, repo)
}

fn five_step_procedure() -> ProcedureInfo {
    (0..5).fold(ProcedureInfo::new("p", "Procedure"), |p, i| {
        p.with_step(ProcedureStep::required(format!("s{i}"), "Step"))
    })
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn score_is_bounded(procedure in arb_procedure(), completed in arb_completed()) {
        let score = scorer::score(&procedure, &completed);
        prop_assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn completing_the_counted_steps_scores_100(procedure in arb_procedure()) {
        let has_required = procedure.required_steps().next().is_some();
        let counted: BTreeSet<StepId> = procedure
            .steps
            .iter()
            .filter(|s| s.required || !has_required)
            .map(|s| s.id.clone())
            .collect();
        prop_assert_eq!(scorer::score(&procedure, &counted), 100.0);
    }

    #[test]
    fn optional_steps_never_move_a_required_score(
        procedure in arb_procedure(),
        completed in arb_completed(),
    ) {
        prop_assume!(procedure.required_steps().next().is_some());
        let optional_only: BTreeSet<StepId> = procedure
            .steps
            .iter()
            .filter(|s| !s.required)
            .map(|s| s.id.clone())
            .collect();
        let with_optional: BTreeSet<StepId> = completed.union(&optional_only).cloned().collect();
        prop_assert_eq!(
            scorer::score(&procedure, &completed),
            scorer::score(&procedure, &with_optional)
        );
    }

    #[test]
    fn reset_always_returns_to_a_clean_scan(
        via_selection in any::<bool>(),
        ops in prop::collection::vec(arb_op(), 0..12),
    ) {
        let (mut engine, _) = make_engine(five_step_procedure());
        if via_selection {
            engine.scan(ScanSource::Nfc, "room-1:sink").unwrap();
            engine.choose_procedure(ProcedureId::new("p")).unwrap();
        } else {
            engine.scan(ScanSource::Qr, "CF-AREA-room-1-PROTOCOL-p").unwrap();
        }

        for op in ops {
            // Events that are illegal in the current state are rejected,
            // which is fine here
            let _ = match op {
                Op::Complete(i) => engine.complete_step(StepId::new(format!("s{i}"))),
                Op::Reopen(i) => engine.reopen_step(StepId::new(format!("s{i}"))),
                Op::Note(i, text) => engine.add_note(StepId::new(format!("s{i}")), text),
                Op::Review => engine.request_review(),
            };
        }

        engine.reset().unwrap();
        prop_assert_eq!(engine.state(), &WorkflowState::Scanning);
        prop_assert!(engine.last_validation().is_none());

        // The next run starts from nothing
        engine.scan(ScanSource::Qr, "CF-AREA-room-1-PROTOCOL-p").unwrap();
        let run = engine.state().run().unwrap();
        prop_assert!(run.progress.is_empty());
    }

    #[test]
    fn review_freezes_the_step_set(steps in prop::collection::btree_set(0usize..5, 0..5)) {
        let (mut engine, _) = make_engine(five_step_procedure());
        engine.scan(ScanSource::Qr, "CF-AREA-room-1-PROTOCOL-p").unwrap();
        for i in &steps {
            engine.complete_step(StepId::new(format!("s{i}"))).unwrap();
        }
        engine.request_review().unwrap();
        let frozen = engine.state().clone();

        for i in 0..5 {
            let id = format!("s{i}");
            prop_assert!(engine.complete_step(StepId::new(id.clone())).is_err());
            prop_assert!(engine.reopen_step(StepId::new(id.clone())).is_err());
            prop_assert!(engine.add_note(StepId::new(id.clone()), "late note").is_err());
        }
        prop_assert_eq!(engine.state(), &frozen);
    }

    #[test]
    fn repeated_confirmations_start_one_save(extra in 1usize..6) {
        let (mut engine, repo) = make_engine(five_step_procedure());
        engine.scan(ScanSource::Qr, "CF-AREA-room-1-PROTOCOL-p").unwrap();
        engine.request_review().unwrap();

        let ticket = engine.confirm_submit().unwrap();
        for _ in 0..extra {
            prop_assert_eq!(
                engine.confirm_submit().unwrap_err(),
                EngineError::State(StateError::InvalidTransition {
                    state: "review",
                    event: "submit_confirmed",
                })
            );
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = runtime.block_on(ticket.send());
        let status = engine.apply_submission(outcome).unwrap();

        prop_assert!(matches!(status, SubmissionStatus::Completed(_)));
        prop_assert_eq!(repo.save_count(), 1);
        prop_assert_eq!(engine.submission_attempts(), 1);
    }
}
