//! Run records: the final artifact of a procedure execution
//!
//! When an operator confirms a reviewed run, a [`CleaningRunRecord`] is
//! assembled once and never changed afterwards. Resubmissions after a
//! failed save send the same record again, so the store sees one id per
//! run no matter how many attempts it took.

use crate::{AreaId, OperatorId, ProcedureId, RunId, ScanSource, StepId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How the operator proved presence at the location
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationMethod {
    QrCode,
    Nfc,
}

impl From<ScanSource> for VerificationMethod {
    fn from(source: ScanSource) -> Self {
        match source {
            ScanSource::Qr => VerificationMethod::QrCode,
            ScanSource::Nfc => VerificationMethod::Nfc,
        }
    }
}

/// One completed step of a run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedStepRecord {
    pub id: String,
    pub step_id: StepId,
    pub name: String,
    pub completed_at: DateTime<Utc>,
    /// Display name of the operator who ticked the step
    pub completed_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub checklist_items: Vec<String>,
}

/// The completed record of a cleaning run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleaningRunRecord {
    pub id: RunId,
    pub procedure_id: ProcedureId,
    pub procedure_name: String,
    pub operator_id: OperatorId,
    pub operator_name: String,
    pub area_id: AreaId,
    pub area_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub verification_method: VerificationMethod,
    /// Completed steps in procedure order. Steps never ticked are absent.
    pub steps: Vec<CompletedStepRecord>,
    /// Percentage in `[0, 100]`, frozen at assembly time
    pub compliance_score: f64,
}

impl CleaningRunRecord {
    /// Whether the frozen score meets a reporting threshold
    pub fn is_compliant(&self, passing_score: f64) -> bool {
        self.compliance_score >= passing_score
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn duration(&self) -> Duration {
        self.end_time.signed_duration_since(self.start_time)
    }

    pub fn step(&self, step_id: &StepId) -> Option<&CompletedStepRecord> {
        self.steps.iter().find(|s| &s.step_id == step_id)
    }
}
