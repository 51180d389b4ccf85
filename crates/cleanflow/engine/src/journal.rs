//! Session journal: ordered audit trail of one workflow session
//!
//! Every accepted transition, rejected event and submission attempt is
//! recorded with the injected clock's timestamp. The journal is bounded
//! (oldest entries drop first) and lives only as long as the session;
//! a reset starts a fresh one.

use chrono::{DateTime, Utc};
use cleanflow_types::{RunId, SessionId};
use serde::Serialize;
use std::collections::VecDeque;

/// Bounded audit log for one session
#[derive(Clone, Debug)]
pub struct SessionJournal {
    session: SessionId,
    entries: VecDeque<JournalEntry>,
    capacity: usize,
    /// Entries evicted because the journal was full
    dropped: usize,
    /// Submission attempts recorded, including evicted ones
    submissions: usize,
}

impl SessionJournal {
    pub fn new(session: SessionId, capacity: usize) -> Self {
        Self {
            session,
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
            submissions: 0,
        }
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Append an entry, evicting the oldest one when full
    pub fn record(&mut self, entry: JournalEntry) {
        tracing::trace!(
            session = %self.session,
            event = %entry.event_type,
            "Journal entry recorded"
        );
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(entry);
    }

    pub fn record_transition(
        &mut self,
        at: DateTime<Utc>,
        event: &'static str,
        from: &'static str,
        to: &'static str,
    ) {
        self.record(JournalEntry::new(
            at,
            JournalEventType::Transition { event, from, to },
            format!("{event}: {from} -> {to}"),
        ));
    }

    pub fn record_rejected(&mut self, at: DateTime<Utc>, event: &'static str, reason: String) {
        self.record(JournalEntry::new(
            at,
            JournalEventType::EventRejected { event },
            format!("{event} rejected: {reason}"),
        ));
    }

    pub fn record_scan_rejected(&mut self, at: DateTime<Utc>, reason: String) {
        self.record(JournalEntry::new(
            at,
            JournalEventType::ScanRejected,
            format!("Scan rejected: {reason}"),
        ));
    }

    pub fn record_submission_started(&mut self, at: DateTime<Utc>, run_id: &RunId, attempt: u32) {
        self.submissions += 1;
        self.record(JournalEntry::new(
            at,
            JournalEventType::SubmissionStarted {
                run_id: run_id.clone(),
                attempt,
            },
            format!("Submitting run {} (attempt {attempt})", run_id.short()),
        ));
    }

    pub fn record_submission_failed(&mut self, at: DateTime<Utc>, attempt: u32, reason: String) {
        self.record(JournalEntry::new(
            at,
            JournalEventType::SubmissionFailed { attempt },
            format!("Submission attempt {attempt} failed: {reason}"),
        ));
    }

    // ── Query methods ────────────────────────────────────────────────

    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn last(&self) -> Option<&JournalEntry> {
        self.entries.back()
    }

    /// Submission attempts recorded in this session, evicted or not
    pub fn submission_attempts(&self) -> usize {
        self.submissions
    }
}

/// One journal entry
#[derive(Clone, Debug, Serialize)]
pub struct JournalEntry {
    pub event_type: JournalEventType,
    /// Human-readable description
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        event_type: JournalEventType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            description: description.into(),
            timestamp,
        }
    }
}

/// Kinds of journal entries
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum JournalEventType {
    /// An event was accepted and moved (or kept) the session in a state
    Transition {
        event: &'static str,
        from: &'static str,
        to: &'static str,
    },
    /// An event was not legal in the current state
    EventRejected { event: &'static str },
    /// A scan failed to parse or validate
    ScanRejected,
    /// A save was sent to the repository
    SubmissionStarted { run_id: RunId, attempt: u32 },
    /// A save failed; the run stays in review
    SubmissionFailed { attempt: u32 },
}

impl std::fmt::Display for JournalEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transition { event, to, .. } => write!(f, "transition:{event}->{to}"),
            Self::EventRejected { event } => write!(f, "rejected:{event}"),
            Self::ScanRejected => write!(f, "scan_rejected"),
            Self::SubmissionStarted { attempt, .. } => write!(f, "submission_started:{attempt}"),
            Self::SubmissionFailed { attempt } => write!(f, "submission_failed:{attempt}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, minute, 0).unwrap()
    }

    #[test]
    fn test_record_entries_in_order() {
        let mut journal = SessionJournal::new(SessionId::new("s-1"), 16);
        journal.record_transition(at(0), "scan_completed", "scanning", "active_procedure");
        journal.record_transition(at(1), "step_completed", "active_procedure", "active_procedure");
        journal.record_rejected(at(2), "reset", "not allowed".into());

        assert_eq!(journal.len(), 3);
        assert_eq!(
            journal.last().unwrap().event_type,
            JournalEventType::EventRejected { event: "reset" }
        );
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut journal = SessionJournal::new(SessionId::new("s-1"), 2);
        journal.record_scan_rejected(at(0), "bad".into());
        journal.record_scan_rejected(at(1), "bad".into());
        journal.record_scan_rejected(at(2), "bad".into());

        assert_eq!(journal.len(), 2);
        assert_eq!(journal.dropped(), 1);
        assert_eq!(journal.entries().next().unwrap().timestamp, at(1));
    }

    #[test]
    fn test_submission_attempts_counted() {
        let mut journal = SessionJournal::new(SessionId::new("s-1"), 16);
        let run_id = RunId::new("run-0123456789");
        journal.record_submission_started(at(0), &run_id, 1);
        journal.record_submission_failed(at(1), 1, "offline".into());
        journal.record_submission_started(at(2), &run_id, 2);

        assert_eq!(journal.submission_attempts(), 2);
        assert!(journal.entries().next().unwrap().description.contains("run-0123"));
    }

    #[test]
    fn test_submission_attempts_survive_eviction() {
        let mut journal = SessionJournal::new(SessionId::new("s-1"), 2);
        let run_id = RunId::new("run-1");
        journal.record_submission_started(at(0), &run_id, 1);
        journal.record_submission_failed(at(1), 1, "offline".into());
        journal.record_submission_started(at(2), &run_id, 2);
        journal.record_submission_failed(at(3), 2, "offline".into());

        assert_eq!(journal.dropped(), 2);
        assert_eq!(journal.submission_attempts(), 2);
    }

    #[test]
    fn test_event_type_display() {
        let evt = JournalEventType::Transition {
            event: "review_requested",
            from: "active_procedure",
            to: "review",
        };
        assert_eq!(format!("{}", evt), "transition:review_requested->review");
    }
}
