//! Workflow engine: one operator session from scan to submitted run
//!
//! The engine owns the live [`WorkflowState`] and is the only thing that
//! mutates it. Every input goes through [`WorkflowEngine::apply`] (or the
//! scan and submission entry points built on it), gets logged, and lands
//! in the session journal whether it was accepted or rejected.

use crate::assembler;
use crate::collaborators::Collaborators;
use crate::config::EngineConfig;
use crate::coordinator::{SubmissionCoordinator, SubmissionOutcome, SubmissionTicket};
use crate::journal::SessionJournal;
use crate::state_machine::{
    self, StateMachine, Transition, TransitionContext, WorkflowEvent, SUBMIT_CONFIRMED,
};
use chrono::{DateTime, Utc};
use cleanflow_types::*;

/// What applying a submission outcome did to the session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Record persisted, session completed
    Completed(RunId),
    /// Outcome belonged to a session that has since been reset; ignored
    Stale,
}

/// Drives one workflow session at a time
pub struct WorkflowEngine {
    collaborators: Collaborators,
    operator: Operator,
    config: EngineConfig,
    state_machine: StateMachine,
    coordinator: SubmissionCoordinator,
    session_id: SessionId,
    state: WorkflowState,
    /// Resolution of the last accepted scan
    last_validation: Option<ValidationResult>,
    /// Why the last scan was refused, cleared by the next good one
    last_scan_error: Option<ScanError>,
    journal: SessionJournal,
}

impl WorkflowEngine {
    /// Start a session in `Scanning`
    pub fn new(collaborators: Collaborators, operator: Operator, config: EngineConfig) -> Self {
        let session_id = SessionId::new(collaborators.ids.new_id());
        let coordinator =
            SubmissionCoordinator::new(collaborators.repository.clone(), &config.submission);
        let journal = SessionJournal::new(session_id.clone(), config.journal_capacity);

        tracing::info!(
            session = %session_id,
            operator = %operator.id,
            "Workflow session started"
        );

        Self {
            collaborators,
            operator,
            config,
            state_machine: StateMachine::new(),
            coordinator,
            session_id,
            state: WorkflowState::Scanning,
            last_validation: None,
            last_scan_error: None,
            journal,
        }
    }

    /// A fresh engine for the same operator and collaborators
    pub fn new_session(&self) -> Self {
        Self::new(
            self.collaborators.clone(),
            self.operator.clone(),
            self.config.clone(),
        )
    }

    // ── Scanning ─────────────────────────────────────────────────────

    /// Parse, validate and apply a raw scanned string.
    ///
    /// Parse and validation failures leave the session in `Scanning`.
    /// An area with an unknown procedure is accepted and moves the
    /// session to procedure selection.
    pub fn scan(&mut self, source: ScanSource, raw: &str) -> EngineResult<ValidationResult> {
        let now = self.collaborators.clock.now();
        if !matches!(self.state, WorkflowState::Scanning) {
            let state = self.state.name();
            return self.reject(
                now,
                "scan_completed",
                StateError::InvalidTransition {
                    state,
                    event: "scan_completed",
                },
            );
        }

        let scanned = match cleanflow_scan::scan(source, raw, self.collaborators.catalog.as_ref())
        {
            Ok(scanned) => scanned,
            Err(e) => {
                tracing::warn!(
                    session = %self.session_id,
                    source = %source,
                    error = %e,
                    "Scan rejected"
                );
                self.journal.record_scan_rejected(now, e.to_string());
                self.last_scan_error = Some(e.clone());
                return Err(e.into());
            }
        };

        let validation = scanned.validation.clone();
        self.last_scan_error = None;
        self.last_validation = Some(validation.clone());
        self.apply(WorkflowEvent::ScanCompleted(scanned))?;
        Ok(validation)
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Apply one event to the session
    pub fn apply(&mut self, event: WorkflowEvent) -> EngineResult<Transition> {
        let now = self.collaborators.clock.now();
        let event_name = event.name();
        let is_reset = matches!(event, WorkflowEvent::Reset);

        let ctx = TransitionContext {
            catalog: self.collaborators.catalog.as_ref(),
            now,
            notes: &self.config.notes,
        };

        let transition = match self.state_machine.apply(&mut self.state, event, &ctx) {
            Ok(t) => t,
            Err(e) => return self.reject(now, event_name, e),
        };

        if is_reset {
            self.start_new_session();
        }

        if transition.is_self_loop() {
            tracing::debug!(
                session = %self.session_id,
                event = transition.event,
                state = transition.from,
                "Workflow event applied"
            );
        } else {
            tracing::info!(
                session = %self.session_id,
                event = transition.event,
                from = transition.from,
                to = transition.to,
                "Workflow transition"
            );
        }
        self.journal
            .record_transition(now, transition.event, transition.from, transition.to);

        Ok(transition)
    }

    pub fn choose_procedure(&mut self, procedure_id: ProcedureId) -> EngineResult<Transition> {
        self.apply(WorkflowEvent::ProcedureChosen(procedure_id))
    }

    pub fn complete_step(&mut self, step_id: StepId) -> EngineResult<Transition> {
        self.apply(WorkflowEvent::StepCompleted(step_id))
    }

    pub fn reopen_step(&mut self, step_id: StepId) -> EngineResult<Transition> {
        self.apply(WorkflowEvent::StepReopened(step_id))
    }

    pub fn add_note(&mut self, step_id: StepId, text: impl Into<String>) -> EngineResult<Transition> {
        self.apply(WorkflowEvent::NoteAdded {
            step_id,
            text: text.into(),
        })
    }

    pub fn request_review(&mut self) -> EngineResult<Transition> {
        self.apply(WorkflowEvent::ReviewRequested)
    }

    /// Discard the session and start a new one in `Scanning`.
    ///
    /// A submission already in flight is not cancelled; its result is
    /// ignored when it comes back.
    pub fn reset(&mut self) -> EngineResult<Transition> {
        self.apply(WorkflowEvent::Reset)
    }

    // ── Submission ───────────────────────────────────────────────────

    /// Confirm submission of the reviewed run.
    ///
    /// The record is assembled on the first confirmation and reused
    /// unchanged by every resubmission. Fails with
    /// [`StateError::InvalidTransition`] while an earlier ticket or its
    /// outcome is still outstanding.
    pub fn confirm_submit(&mut self) -> EngineResult<SubmissionTicket> {
        let now = self.collaborators.clock.now();

        let record = match &mut self.state {
            WorkflowState::Review(review) => {
                if review.record.is_none() {
                    review.record = Some(assembler::assemble(
                        &review.run,
                        &self.operator,
                        self.collaborators.ids.as_ref(),
                        self.collaborators.clock.as_ref(),
                    ));
                }
                review.record.clone()
            }
            _ => None,
        };

        let Some(record) = record else {
            let state = self.state.name();
            return self.reject(
                now,
                SUBMIT_CONFIRMED,
                StateError::InvalidTransition {
                    state,
                    event: SUBMIT_CONFIRMED,
                },
            );
        };

        let run_id = record.id.clone();
        let ticket = match self.coordinator.begin(self.session_id.clone(), record) {
            Ok(ticket) => ticket,
            Err(e) => return self.reject(now, SUBMIT_CONFIRMED, e),
        };

        if let WorkflowState::Review(review) = &mut self.state {
            review.last_error = None;
        }
        self.journal
            .record_submission_started(now, &run_id, ticket.attempt());

        Ok(ticket)
    }

    /// Feed a submission result back into the session
    pub fn apply_submission(&mut self, outcome: SubmissionOutcome) -> EngineResult<SubmissionStatus> {
        let now = self.collaborators.clock.now();

        if outcome.session != self.session_id {
            tracing::info!(
                session = %self.session_id,
                stale_session = %outcome.session,
                run_id = %outcome.run_id,
                "Ignoring submission result from a reset session"
            );
            return Ok(SubmissionStatus::Stale);
        }

        match outcome.result {
            Ok(()) => {
                let run_id = outcome.run_id;
                let score = self.pending_record().map(|r| r.compliance_score);

                let transition = match state_machine::complete_submission(
                    &mut self.state,
                    run_id.clone(),
                ) {
                    Ok(t) => t,
                    Err(e) => return self.reject(now, SUBMIT_CONFIRMED, e),
                };

                tracing::info!(
                    session = %self.session_id,
                    run_id = %run_id,
                    attempt = outcome.attempt,
                    score = score.unwrap_or_default(),
                    compliant = score.is_some_and(|s| s >= self.config.compliance.passing_score),
                    "Run submitted"
                );
                self.journal
                    .record_transition(now, transition.event, transition.from, transition.to);

                Ok(SubmissionStatus::Completed(run_id))
            }
            Err(e) => {
                if let Err(state_err) =
                    state_machine::fail_submission(&mut self.state, e.user_message())
                {
                    return self.reject(now, SUBMIT_CONFIRMED, state_err);
                }
                self.journal
                    .record_submission_failed(now, outcome.attempt, e.to_string());
                Err(e.into())
            }
        }
    }

    /// Confirm, send and apply in one go
    pub async fn submit(&mut self) -> EngineResult<SubmissionStatus> {
        let ticket = self.confirm_submit()?;
        let outcome = ticket.send().await;
        self.apply_submission(outcome)
    }

    // ── Query methods ────────────────────────────────────────────────

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn last_validation(&self) -> Option<&ValidationResult> {
        self.last_validation.as_ref()
    }

    pub fn last_scan_error(&self) -> Option<&ScanError> {
        self.last_scan_error.as_ref()
    }

    /// Operator-facing message for the most recent failure, if any
    pub fn last_error(&self) -> Option<String> {
        match &self.state {
            WorkflowState::Review(review) => review.last_error.clone(),
            WorkflowState::Scanning => self.last_scan_error.as_ref().map(ScanError::user_message),
            _ => None,
        }
    }

    /// The record awaiting (re)submission
    pub fn pending_record(&self) -> Option<&CleaningRunRecord> {
        match &self.state {
            WorkflowState::Review(review) => review.record.as_ref(),
            _ => None,
        }
    }

    /// Attempts started in this session
    pub fn submission_attempts(&self) -> u32 {
        self.coordinator.attempts()
    }

    pub fn is_submitting(&self) -> bool {
        self.coordinator.is_submitting()
    }

    pub fn journal(&self) -> &SessionJournal {
        &self.journal
    }

    // ── Internals ────────────────────────────────────────────────────

    fn reject<T>(
        &mut self,
        now: DateTime<Utc>,
        event: &'static str,
        error: StateError,
    ) -> EngineResult<T> {
        tracing::warn!(
            session = %self.session_id,
            state = self.state.name(),
            event,
            error = %error,
            "Workflow event rejected"
        );
        self.journal.record_rejected(now, event, error.to_string());
        Err(error.into())
    }

    fn start_new_session(&mut self) {
        let previous = std::mem::replace(
            &mut self.session_id,
            SessionId::new(self.collaborators.ids.new_id()),
        );

        if self.coordinator.is_submitting() {
            tracing::info!(
                session = %previous,
                "Detaching in-flight submission from reset session"
            );
        }
        self.coordinator.reset();
        self.journal = SessionJournal::new(self.session_id.clone(), self.config.journal_capacity);
        self.last_validation = None;
        self.last_scan_error = None;

        tracing::info!(
            previous = %previous,
            session = %self.session_id,
            "Workflow session reset"
        );
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("session_id", &self.session_id)
            .field("operator", &self.operator.id)
            .field("state", &self.state.name())
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}
