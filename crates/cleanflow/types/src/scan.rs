//! Scan payloads and their catalog validation results
//!
//! A scan is decoded exactly once, by the scan parser, into a
//! [`ScanPayload`]. Downstream code never re-branches on the raw string
//! or on the hardware that produced it: it only sees the normalized
//! payload and its [`ScanSource`] tag.

use crate::{AreaId, ProcedureId};
use serde::{Deserialize, Serialize};

/// Where a scanned code came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSource {
    Qr,
    Nfc,
}

impl std::fmt::Display for ScanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanSource::Qr => write!(f, "QR"),
            ScanSource::Nfc => write!(f, "NFC"),
        }
    }
}

/// A decoded scan.
///
/// The area id is always non-empty. A procedure id is only present for
/// QR codes that encoded one; an asset type only for NFC tags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanPayload {
    kind: ScanSource,
    area_id: AreaId,
    #[serde(skip_serializing_if = "Option::is_none")]
    procedure_id: Option<ProcedureId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    asset_type: Option<String>,
    /// Display name hint carried by query-string codes. Never used for lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl ScanPayload {
    /// Build a QR payload. Returns `None` when the area id is empty.
    pub fn qr(area_id: impl Into<String>, procedure_id: Option<ProcedureId>) -> Option<Self> {
        let area_id = area_id.into();
        if area_id.is_empty() {
            return None;
        }
        Some(Self {
            kind: ScanSource::Qr,
            area_id: AreaId(area_id),
            procedure_id: procedure_id.filter(|p| !p.0.is_empty()),
            asset_type: None,
            label: None,
        })
    }

    /// Build an NFC payload. Returns `None` when the area id is empty.
    pub fn nfc(area_id: impl Into<String>, asset_type: impl Into<String>) -> Option<Self> {
        let area_id = area_id.into();
        if area_id.is_empty() {
            return None;
        }
        let asset_type = asset_type.into();
        Some(Self {
            kind: ScanSource::Nfc,
            area_id: AreaId(area_id),
            procedure_id: None,
            asset_type: (!asset_type.is_empty()).then_some(asset_type),
            label: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.label = (!label.is_empty()).then_some(label);
        self
    }

    pub fn kind(&self) -> ScanSource {
        self.kind
    }

    pub fn area_id(&self) -> &AreaId {
        &self.area_id
    }

    pub fn procedure_id(&self) -> Option<&ProcedureId> {
        self.procedure_id.as_ref()
    }

    pub fn asset_type(&self) -> Option<&str> {
        self.asset_type.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Label reported when a scanned procedure id is not in the active set
pub const UNKNOWN_PROCEDURE_NAME: &str = "Unknown Protocol";

/// A scan payload resolved against the catalog. Recomputed on every scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub area_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedure_name: Option<String>,
}

impl ValidationResult {
    /// Area known, procedure either resolved or left for manual selection
    pub fn valid(area_name: impl Into<String>, procedure_name: Option<String>) -> Self {
        Self {
            is_valid: true,
            area_name: area_name.into(),
            procedure_name,
        }
    }

    /// Area known, scanned procedure not active: operator picks manually
    pub fn unknown_procedure(area_name: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            area_name: area_name.into(),
            procedure_name: Some(UNKNOWN_PROCEDURE_NAME.to_string()),
        }
    }

    /// Whether the scan already names a procedure that exists in the catalog
    pub fn has_resolved_procedure(&self) -> bool {
        self.is_valid && self.procedure_name.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_area_rejected() {
        assert!(ScanPayload::qr("", None).is_none());
        assert!(ScanPayload::nfc("", "sink").is_none());
    }

    #[test]
    fn test_empty_procedure_treated_as_absent() {
        let payload = ScanPayload::qr("room-1", Some(ProcedureId::new(""))).unwrap();
        assert!(payload.procedure_id().is_none());
    }

    #[test]
    fn test_nfc_payload_has_no_procedure() {
        let payload = ScanPayload::nfc("room-5", "medical_device").unwrap();
        assert_eq!(payload.kind(), ScanSource::Nfc);
        assert_eq!(payload.asset_type(), Some("medical_device"));
        assert!(payload.procedure_id().is_none());
    }

    #[test]
    fn test_resolved_procedure() {
        assert!(ValidationResult::valid("OR 1", Some("Protocol A".into())).has_resolved_procedure());
        assert!(!ValidationResult::valid("OR 1", None).has_resolved_procedure());
        assert!(!ValidationResult::unknown_procedure("OR 1").has_resolved_procedure());
    }
}
