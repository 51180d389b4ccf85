//! Submission coordinator: at most one save in flight per session
//!
//! A submission is split into three explicit steps so that no borrow of
//! the engine is held across the network call:
//!
//! 1. [`SubmissionCoordinator::begin`] takes the in-flight permit and
//!    hands out a [`SubmissionTicket`]. A second `begin` while the permit
//!    is held is rejected, not queued.
//! 2. [`SubmissionTicket::send`] performs exactly one `Repository::save`.
//! 3. The resulting [`SubmissionOutcome`] is fed back to the engine.
//!
//! The permit is released when the outcome (or an unsent ticket) is
//! dropped. There is no automatic retry.

use crate::collaborators::Repository;
use crate::config::SubmissionConfig;
use crate::state_machine::SUBMIT_CONFIRMED;
use cleanflow_types::{CleaningRunRecord, RunId, SessionId, StateError, SubmissionError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Guards re-entrant submissions for one session
pub struct SubmissionCoordinator {
    repository: Arc<dyn Repository>,
    timeout: Duration,
    /// Set while a ticket or its outcome is alive
    submitting: Arc<AtomicBool>,
    /// Attempts started in the current session
    attempts: u32,
}

impl SubmissionCoordinator {
    pub fn new(repository: Arc<dyn Repository>, config: &SubmissionConfig) -> Self {
        Self {
            repository,
            timeout: config.timeout,
            submitting: Arc::new(AtomicBool::new(false)),
            attempts: 0,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Take the in-flight permit for `record`
    pub fn begin(
        &mut self,
        session: SessionId,
        record: CleaningRunRecord,
    ) -> Result<SubmissionTicket, StateError> {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(StateError::InvalidTransition {
                state: "review",
                event: SUBMIT_CONFIRMED,
            });
        }
        self.attempts += 1;

        Ok(SubmissionTicket {
            session,
            attempt: self.attempts,
            record,
            repository: Arc::clone(&self.repository),
            timeout: self.timeout,
            permit: InFlightPermit {
                flag: Arc::clone(&self.submitting),
            },
        })
    }

    /// Detach from the current session.
    ///
    /// A submission still in flight keeps its own permit and finishes on
    /// its own; the next session starts with a clear flag.
    pub fn reset(&mut self) {
        self.submitting = Arc::new(AtomicBool::new(false));
        self.attempts = 0;
    }
}

impl std::fmt::Debug for SubmissionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionCoordinator")
            .field("timeout", &self.timeout)
            .field("submitting", &self.is_submitting())
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// Clears the session's `submitting` flag when dropped
#[derive(Debug)]
struct InFlightPermit {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// A submission that holds the in-flight permit but has not been sent
pub struct SubmissionTicket {
    session: SessionId,
    attempt: u32,
    record: CleaningRunRecord,
    repository: Arc<dyn Repository>,
    timeout: Duration,
    permit: InFlightPermit,
}

impl SubmissionTicket {
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn record(&self) -> &CleaningRunRecord {
        &self.record
    }

    /// Save the record once, bounded by the configured timeout
    pub async fn send(self) -> SubmissionOutcome {
        tracing::info!(
            session = %self.session,
            run_id = %self.record.id,
            attempt = self.attempt,
            "Submitting run record"
        );

        let result = match tokio::time::timeout(self.timeout, self.repository.save(&self.record))
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SubmissionError::Storage(e.to_string())),
            Err(_) => Err(SubmissionError::Timeout(self.timeout.as_millis() as u64)),
        };

        if let Err(e) = &result {
            tracing::warn!(
                session = %self.session,
                run_id = %self.record.id,
                attempt = self.attempt,
                error = %e,
                "Run record save failed"
            );
        }

        SubmissionOutcome {
            session: self.session,
            run_id: self.record.id,
            attempt: self.attempt,
            result,
            _permit: self.permit,
        }
    }
}

impl std::fmt::Debug for SubmissionTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionTicket")
            .field("session", &self.session)
            .field("attempt", &self.attempt)
            .field("run_id", &self.record.id)
            .finish_non_exhaustive()
    }
}

/// The result of one save, waiting to be applied to the engine
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub(crate) session: SessionId,
    pub(crate) run_id: RunId,
    pub(crate) attempt: u32,
    pub(crate) result: Result<(), SubmissionError>,
    _permit: InFlightPermit,
}

impl SubmissionOutcome {
    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&SubmissionError> {
        self.result.as_ref().err()
    }
}
