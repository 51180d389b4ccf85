//! State machine: the legal moves of a workflow session
//!
//! The state machine owns no state of its own. It applies one
//! [`WorkflowEvent`] to a [`WorkflowState`] and either moves it forward or
//! rejects the event, leaving the state exactly as it was. Submission
//! results are applied through the crate-private helpers at the bottom,
//! since only the engine may feed them back.

use crate::config::NoteConfig;
use chrono::{DateTime, Utc};
use cleanflow_types::*;

/// Event name used for confirmed submissions in logs and the journal
pub const SUBMIT_CONFIRMED: &str = "submit_confirmed";

const SUBMISSION_SUCCEEDED: &str = "submission_succeeded";
const SUBMISSION_FAILED: &str = "submission_failed";

/// Operator and scanner input that drives a session
#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowEvent {
    /// A scan that parsed and resolved to a known area
    ScanCompleted(ScannedArea),
    /// Operator picked a procedure manually
    ProcedureChosen(ProcedureId),
    StepCompleted(StepId),
    /// Un-tick a step completed by mistake
    StepReopened(StepId),
    NoteAdded { step_id: StepId, text: String },
    ReviewRequested,
    /// Discard the session and go back to scanning
    Reset,
}

impl WorkflowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowEvent::ScanCompleted(_) => "scan_completed",
            WorkflowEvent::ProcedureChosen(_) => "procedure_chosen",
            WorkflowEvent::StepCompleted(_) => "step_completed",
            WorkflowEvent::StepReopened(_) => "step_reopened",
            WorkflowEvent::NoteAdded { .. } => "note_added",
            WorkflowEvent::ReviewRequested => "review_requested",
            WorkflowEvent::Reset => "reset",
        }
    }
}

/// Read-only inputs a transition may consult
pub struct TransitionContext<'a> {
    pub catalog: &'a dyn Catalog,
    pub now: DateTime<Utc>,
    pub notes: &'a NoteConfig,
}

/// An accepted event and the states it moved between
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub event: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

impl Transition {
    /// Whether the event left the session in the same state kind
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// Applies events to workflow states
#[derive(Clone, Debug, Default)]
pub struct StateMachine;

impl StateMachine {
    pub fn new() -> Self {
        Self
    }

    /// Apply `event` to `state`.
    ///
    /// On error `state` is left untouched.
    pub fn apply(
        &self,
        state: &mut WorkflowState,
        event: WorkflowEvent,
        ctx: &TransitionContext<'_>,
    ) -> Result<Transition, StateError> {
        let from = state.name();
        let event_name = event.name();

        let next = match state {
            WorkflowState::Scanning => match event {
                WorkflowEvent::ScanCompleted(scan) => Some(self.enter_from_scan(scan, ctx)),
                _ => None,
            },

            WorkflowState::ProcedureSelection { scan } => match event {
                WorkflowEvent::ProcedureChosen(procedure_id) => {
                    let procedure = ctx
                        .catalog
                        .find_active_procedure(&procedure_id)
                        .ok_or(StateError::UnknownProcedure(procedure_id))?;
                    Some(WorkflowState::ActiveProcedure(ProcedureRun::start(
                        scan.clone(),
                        procedure,
                        ctx.now,
                    )))
                }
                WorkflowEvent::Reset => Some(WorkflowState::Scanning),
                _ => None,
            },

            WorkflowState::ActiveProcedure(run) => match event {
                WorkflowEvent::StepCompleted(step_id) => {
                    if !run.procedure.contains_step(&step_id) {
                        return Err(StateError::UnknownStep(step_id));
                    }
                    run.progress.complete(step_id, ctx.now);
                    return Ok(self_loop(event_name, from));
                }
                WorkflowEvent::StepReopened(step_id) => {
                    if !run.procedure.contains_step(&step_id) {
                        return Err(StateError::UnknownStep(step_id));
                    }
                    run.progress.reopen(&step_id);
                    return Ok(self_loop(event_name, from));
                }
                WorkflowEvent::NoteAdded { step_id, text } => {
                    run.progress.set_note(step_id, ctx.notes.normalize(&text));
                    return Ok(self_loop(event_name, from));
                }
                WorkflowEvent::ReviewRequested => {
                    Some(WorkflowState::Review(ReviewedRun::new(run.clone())))
                }
                WorkflowEvent::Reset => Some(WorkflowState::Scanning),
                _ => None,
            },

            WorkflowState::Review(_) => match event {
                WorkflowEvent::Reset => Some(WorkflowState::Scanning),
                _ => None,
            },

            WorkflowState::Completed { .. } => None,
        };

        let Some(next) = next else {
            return Err(StateError::InvalidTransition {
                state: from,
                event: event_name,
            });
        };

        *state = next;
        Ok(Transition {
            event: event_name,
            from,
            to: state.name(),
        })
    }

    /// Scan fan-out: straight into the procedure when the scan already
    /// names an active one, otherwise to manual selection.
    fn enter_from_scan(&self, scan: ScannedArea, ctx: &TransitionContext<'_>) -> WorkflowState {
        let procedure = scan
            .payload
            .procedure_id()
            .filter(|_| scan.validation.has_resolved_procedure())
            .and_then(|id| ctx.catalog.find_active_procedure(id));

        match procedure {
            Some(procedure) => {
                WorkflowState::ActiveProcedure(ProcedureRun::start(scan, procedure, ctx.now))
            }
            None => WorkflowState::ProcedureSelection { scan },
        }
    }
}

fn self_loop(event: &'static str, state: &'static str) -> Transition {
    Transition {
        event,
        from: state,
        to: state,
    }
}

// ── Submission results ───────────────────────────────────────────────

/// Review -> Completed once the record is persisted
pub(crate) fn complete_submission(
    state: &mut WorkflowState,
    run_id: RunId,
) -> Result<Transition, StateError> {
    let from = state.name();
    if !matches!(state, WorkflowState::Review(_)) {
        return Err(StateError::InvalidTransition {
            state: from,
            event: SUBMISSION_SUCCEEDED,
        });
    }

    *state = WorkflowState::Completed { run_id };
    Ok(Transition {
        event: SUBMISSION_SUCCEEDED,
        from,
        to: state.name(),
    })
}

/// Stay in Review with the record retained and a message for the operator
pub(crate) fn fail_submission(
    state: &mut WorkflowState,
    message: String,
) -> Result<Transition, StateError> {
    let from = state.name();
    match state {
        WorkflowState::Review(review) => {
            review.last_error = Some(message);
            Ok(self_loop(SUBMISSION_FAILED, from))
        }
        _ => Err(StateError::InvalidTransition {
            state: from,
            event: SUBMISSION_FAILED,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCatalog;
    use chrono::TimeZone;

    fn make_catalog() -> InMemoryCatalog {
        InMemoryCatalog::new()
            .with_area(AreaInfo::new("room-1", "Operating Room 1"))
            .with_procedure(
                ProcedureInfo::new("protocol-1", "OR Suite Protocol A")
                    .with_step(ProcedureStep::required("s1", "Remove waste"))
                    .with_step(ProcedureStep::required("s2", "Disinfect surfaces"))
                    .with_step(ProcedureStep::optional("s3", "Restock")),
            )
    }

    fn make_scan(procedure: Option<&str>) -> ScannedArea {
        let payload = ScanPayload::qr("room-1", procedure.map(ProcedureId::new)).unwrap();
        let validation = match procedure {
            Some("protocol-1") => {
                ValidationResult::valid("Operating Room 1", Some("OR Suite Protocol A".into()))
            }
            Some(_) => ValidationResult::unknown_procedure("Operating Room 1"),
            None => ValidationResult::valid("Operating Room 1", None),
        };
        ScannedArea::new(payload, validation)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn apply(
        state: &mut WorkflowState,
        event: WorkflowEvent,
    ) -> Result<Transition, StateError> {
        let catalog = make_catalog();
        let notes = NoteConfig::default();
        let ctx = TransitionContext {
            catalog: &catalog,
            now: now(),
            notes: &notes,
        };
        StateMachine::new().apply(state, event, &ctx)
    }

    fn active_state() -> WorkflowState {
        let mut state = WorkflowState::Scanning;
        apply(
            &mut state,
            WorkflowEvent::ScanCompleted(make_scan(Some("protocol-1"))),
        )
        .unwrap();
        state
    }

    #[test]
    fn test_scan_with_resolved_procedure_skips_selection() {
        let state = active_state();
        let run = state.run().unwrap();
        assert_eq!(state.name(), "active_procedure");
        assert_eq!(run.procedure.name, "OR Suite Protocol A");
        assert!(run.progress.is_empty());
        assert_eq!(run.started_at, now());
    }

    #[test]
    fn test_scan_without_procedure_goes_to_selection() {
        let mut state = WorkflowState::Scanning;
        let t = apply(&mut state, WorkflowEvent::ScanCompleted(make_scan(None))).unwrap();
        assert_eq!(t.from, "scanning");
        assert_eq!(t.to, "procedure_selection");
    }

    #[test]
    fn test_unknown_procedure_goes_to_selection() {
        let mut state = WorkflowState::Scanning;
        apply(
            &mut state,
            WorkflowEvent::ScanCompleted(make_scan(Some("protocol-9"))),
        )
        .unwrap();
        assert!(matches!(state, WorkflowState::ProcedureSelection { .. }));
    }

    #[test]
    fn test_choose_procedure() {
        let mut state = WorkflowState::Scanning;
        apply(&mut state, WorkflowEvent::ScanCompleted(make_scan(None))).unwrap();

        let err = apply(
            &mut state,
            WorkflowEvent::ProcedureChosen(ProcedureId::new("nope")),
        )
        .unwrap_err();
        assert_eq!(err, StateError::UnknownProcedure(ProcedureId::new("nope")));
        assert_eq!(state.name(), "procedure_selection");

        apply(
            &mut state,
            WorkflowEvent::ProcedureChosen(ProcedureId::new("protocol-1")),
        )
        .unwrap();
        assert_eq!(state.name(), "active_procedure");
        assert_eq!(state.scan().unwrap().area_name(), "Operating Room 1");
    }

    #[test]
    fn test_step_completion_and_guard() {
        let mut state = active_state();

        let t = apply(&mut state, WorkflowEvent::StepCompleted(StepId::new("s1"))).unwrap();
        assert!(t.is_self_loop());
        // Completing twice is harmless
        apply(&mut state, WorkflowEvent::StepCompleted(StepId::new("s1"))).unwrap();

        let err = apply(&mut state, WorkflowEvent::StepCompleted(StepId::new("x"))).unwrap_err();
        assert_eq!(err, StateError::UnknownStep(StepId::new("x")));

        let run = state.run().unwrap();
        assert_eq!(run.progress.completed_count(), 1);
        assert_eq!(run.progress.completed_at(&StepId::new("s1")), Some(now()));
    }

    #[test]
    fn test_step_reopened() {
        let mut state = active_state();
        apply(&mut state, WorkflowEvent::StepCompleted(StepId::new("s2"))).unwrap();
        apply(&mut state, WorkflowEvent::StepReopened(StepId::new("s2"))).unwrap();
        assert!(!state.run().unwrap().progress.is_completed(&StepId::new("s2")));
    }

    #[test]
    fn test_note_is_normalized() {
        let mut state = active_state();
        apply(
            &mut state,
            WorkflowEvent::NoteAdded {
                step_id: StepId::new("s1"),
                text: "  used bleach  ".into(),
            },
        )
        .unwrap();
        assert_eq!(
            state.run().unwrap().progress.note(&StepId::new("s1")),
            Some("used bleach")
        );
    }

    #[test]
    fn test_review_freezes_steps() {
        let mut state = active_state();
        apply(&mut state, WorkflowEvent::StepCompleted(StepId::new("s1"))).unwrap();
        apply(&mut state, WorkflowEvent::ReviewRequested).unwrap();
        assert_eq!(state.name(), "review");

        let before = state.clone();
        let err = apply(&mut state, WorkflowEvent::StepCompleted(StepId::new("s2"))).unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidTransition {
                state: "review",
                event: "step_completed"
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_reset_from_non_terminal_states() {
        let mut selection = WorkflowState::Scanning;
        apply(&mut selection, WorkflowEvent::ScanCompleted(make_scan(None))).unwrap();

        let mut active = active_state();
        apply(&mut active, WorkflowEvent::StepCompleted(StepId::new("s1"))).unwrap();

        let mut review = active.clone();
        apply(&mut review, WorkflowEvent::ReviewRequested).unwrap();

        for mut state in [selection, active, review] {
            apply(&mut state, WorkflowEvent::Reset).unwrap();
            assert_eq!(state, WorkflowState::Scanning);
        }
    }

    #[test]
    fn test_reset_rejected_in_scanning_and_completed() {
        let mut scanning = WorkflowState::Scanning;
        assert!(apply(&mut scanning, WorkflowEvent::Reset).is_err());

        let mut completed = WorkflowState::Completed {
            run_id: RunId::new("r"),
        };
        assert!(apply(&mut completed, WorkflowEvent::Reset).is_err());
        assert!(completed.is_terminal());
    }

    #[test]
    fn test_submission_results() {
        let mut state = active_state();
        apply(&mut state, WorkflowEvent::ReviewRequested).unwrap();

        fail_submission(&mut state, "try again".into()).unwrap();
        match &state {
            WorkflowState::Review(review) => {
                assert_eq!(review.last_error.as_deref(), Some("try again"))
            }
            other => panic!("unexpected state {other}"),
        }

        let t = complete_submission(&mut state, RunId::new("run-1")).unwrap();
        assert_eq!(t.to, "completed");
        assert!(complete_submission(&mut state, RunId::new("run-2")).is_err());
        assert!(fail_submission(&mut state, "late".into()).is_err());
    }
}
