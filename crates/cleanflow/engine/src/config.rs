//! Engine configuration.
//!
//! Defines submission, note handling and compliance reporting behaviour.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Submission behaviour.
    pub submission: SubmissionConfig,

    /// Step note handling.
    pub notes: NoteConfig,

    /// Compliance reporting.
    pub compliance: ComplianceConfig,

    /// Maximum number of journal entries kept per session.
    pub journal_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            submission: SubmissionConfig::default(),
            notes: NoteConfig::default(),
            compliance: ComplianceConfig::default(),
            journal_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Short timeout, every required step must be done to count as compliant.
    pub fn strict() -> Self {
        Self {
            submission: SubmissionConfig {
                timeout: Duration::from_secs(10),
            },
            notes: NoteConfig {
                max_len: 500,
                trim: true,
            },
            compliance: ComplianceConfig {
                passing_score: 100.0,
            },
            journal_capacity: 512,
        }
    }

    /// Tolerant of slow links and partial runs.
    pub fn relaxed() -> Self {
        Self {
            submission: SubmissionConfig {
                timeout: Duration::from_secs(120),
            },
            notes: NoteConfig {
                max_len: 4000,
                trim: true,
            },
            compliance: ComplianceConfig {
                passing_score: 80.0,
            },
            journal_capacity: 128,
        }
    }
}

/// Submission configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// How long a single save may take before it counts as failed.
    pub timeout: Duration,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Note configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteConfig {
    /// Maximum note length in characters; longer notes are truncated.
    pub max_len: usize,

    /// Strip leading and trailing whitespace.
    pub trim: bool,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            max_len: 1000,
            trim: true,
        }
    }
}

impl NoteConfig {
    /// Normalize operator input into the stored note text
    pub fn normalize(&self, text: &str) -> String {
        let text = if self.trim { text.trim() } else { text };
        text.chars().take(self.max_len).collect()
    }
}

/// Compliance reporting configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// Minimum score (0-100) for a run to be reported as compliant.
    pub passing_score: f64,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            passing_score: 100.0,
        }
    }
}
