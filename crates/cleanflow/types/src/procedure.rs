//! Catalog entries: areas, procedures and their checklist steps

use crate::{AreaId, OperatorId, ProcedureId, StepId};
use serde::{Deserialize, Serialize};

/// A known physical location
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaInfo {
    pub id: AreaId,
    pub name: String,
    /// Free-form classification ("operating_room", "ward", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_type: Option<String>,
}

impl AreaInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: AreaId::new(id),
            name: name.into(),
            area_type: None,
        }
    }

    pub fn with_type(mut self, area_type: impl Into<String>) -> Self {
        self.area_type = Some(area_type.into());
        self
    }
}

/// One step of a procedure checklist
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureStep {
    pub id: StepId,
    pub name: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checklist_items: Vec<String>,
}

impl ProcedureStep {
    /// A step that counts toward compliance
    pub fn required(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: StepId::new(id),
            name: name.into(),
            required: true,
            checklist_items: Vec::new(),
        }
    }

    /// A step that only counts when no step of the procedure is required
    pub fn optional(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: StepId::new(id),
            name: name.into(),
            required: false,
            checklist_items: Vec::new(),
        }
    }

    pub fn with_checklist_item(mut self, item: impl Into<String>) -> Self {
        self.checklist_items.push(item.into());
        self
    }
}

/// A named checklist to execute at a location
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureInfo {
    pub id: ProcedureId,
    pub name: String,
    /// Steps in execution order
    pub steps: Vec<ProcedureStep>,
    /// Inactive procedures are kept for history but cannot be started
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ProcedureInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ProcedureId::new(id),
            name: name.into(),
            steps: Vec::new(),
            is_active: true,
        }
    }

    pub fn with_step(mut self, step: ProcedureStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn step(&self, id: &StepId) -> Option<&ProcedureStep> {
        self.steps.iter().find(|s| &s.id == id)
    }

    pub fn contains_step(&self, id: &StepId) -> bool {
        self.step(id).is_some()
    }

    pub fn required_steps(&self) -> impl Iterator<Item = &ProcedureStep> {
        self.steps.iter().filter(|s| s.required)
    }
}

/// The authenticated operator executing procedures
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: OperatorId,
    pub name: String,
}

impl Operator {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: OperatorId::new(id),
            name: name.into(),
        }
    }
}
