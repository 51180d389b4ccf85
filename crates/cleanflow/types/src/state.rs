//! Workflow session state
//!
//! A session moves Scanning -> ProcedureSelection -> ActiveProcedure ->
//! Review -> Completed, skipping ProcedureSelection when the scan already
//! resolved a procedure. Exactly one [`WorkflowState`] is live per session
//! and only the engine mutates it.

use crate::{CleaningRunRecord, ProcedureInfo, RunId, ScanPayload, StepId, ValidationResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// ── Scanned area ─────────────────────────────────────────────────────

/// A payload together with its catalog resolution
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScannedArea {
    pub payload: ScanPayload,
    pub validation: ValidationResult,
}

impl ScannedArea {
    pub fn new(payload: ScanPayload, validation: ValidationResult) -> Self {
        Self {
            payload,
            validation,
        }
    }

    pub fn area_name(&self) -> &str {
        &self.validation.area_name
    }
}

// ── Step progress ────────────────────────────────────────────────────

/// Steps ticked so far and the notes attached to them
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StepProgress {
    /// Completed step ids with the time each was ticked
    completed: BTreeMap<StepId, DateTime<Utc>>,
    notes: BTreeMap<StepId, String>,
}

impl StepProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a step completed. Returns false if it already was; the
    /// original completion time is kept.
    pub fn complete(&mut self, step_id: StepId, at: DateTime<Utc>) -> bool {
        if self.completed.contains_key(&step_id) {
            return false;
        }
        self.completed.insert(step_id, at);
        true
    }

    /// Un-tick a step. Returns false if it was not completed.
    pub fn reopen(&mut self, step_id: &StepId) -> bool {
        self.completed.remove(step_id).is_some()
    }

    /// Attach a note to a step; an empty note removes it
    pub fn set_note(&mut self, step_id: StepId, text: String) {
        if text.is_empty() {
            self.notes.remove(&step_id);
        } else {
            self.notes.insert(step_id, text);
        }
    }

    pub fn is_completed(&self, step_id: &StepId) -> bool {
        self.completed.contains_key(step_id)
    }

    pub fn completed_at(&self, step_id: &StepId) -> Option<DateTime<Utc>> {
        self.completed.get(step_id).copied()
    }

    pub fn completed_step_ids(&self) -> BTreeSet<StepId> {
        self.completed.keys().cloned().collect()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn note(&self, step_id: &StepId) -> Option<&str> {
        self.notes.get(step_id).map(String::as_str)
    }

    pub fn notes(&self) -> &BTreeMap<StepId, String> {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.notes.is_empty()
    }
}

// ── Procedure run ────────────────────────────────────────────────────

/// A procedure being executed (or under review) at a scanned area
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcedureRun {
    pub scan: ScannedArea,
    pub procedure: ProcedureInfo,
    pub progress: StepProgress,
    /// When the run entered ActiveProcedure
    pub started_at: DateTime<Utc>,
}

impl ProcedureRun {
    /// Start a run with no completed steps and no notes
    pub fn start(scan: ScannedArea, procedure: ProcedureInfo, started_at: DateTime<Utc>) -> Self {
        Self {
            scan,
            procedure,
            progress: StepProgress::new(),
            started_at,
        }
    }
}

/// A run frozen for review, plus what the submission has produced so far
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewedRun {
    pub run: ProcedureRun,
    /// Assembled on the first confirmed submission and reused on retries
    pub record: Option<CleaningRunRecord>,
    /// User-facing message from the last failed submission
    pub last_error: Option<String>,
}

impl ReviewedRun {
    pub fn new(run: ProcedureRun) -> Self {
        Self {
            run,
            record: None,
            last_error: None,
        }
    }
}

// ── Workflow state ───────────────────────────────────────────────────

/// The live state of one workflow session
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    /// Waiting for a code to be scanned
    #[default]
    Scanning,
    /// Area known, operator must pick a procedure
    ProcedureSelection { scan: ScannedArea },
    /// Operator is working through the checklist
    ActiveProcedure(ProcedureRun),
    /// Step set frozen; awaiting (or retrying) submission
    Review(ReviewedRun),
    /// Run persisted
    Completed { run_id: RunId },
}

impl WorkflowState {
    /// Stable name for logs and journal entries
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Scanning => "scanning",
            WorkflowState::ProcedureSelection { .. } => "procedure_selection",
            WorkflowState::ActiveProcedure(_) => "active_procedure",
            WorkflowState::Review(_) => "review",
            WorkflowState::Completed { .. } => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Completed { .. })
    }

    /// The run being executed or reviewed, if any
    pub fn run(&self) -> Option<&ProcedureRun> {
        match self {
            WorkflowState::ActiveProcedure(run) => Some(run),
            WorkflowState::Review(review) => Some(&review.run),
            _ => None,
        }
    }

    pub fn scan(&self) -> Option<&ScannedArea> {
        match self {
            WorkflowState::ProcedureSelection { scan } => Some(scan),
            other => other.run().map(|r| &r.scan),
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
