//! Scan validator: resolves a decoded payload against the catalog
//!
//! An unknown area rejects the whole scan, since every later step needs
//! an area name. An unknown procedure only degrades the result: the area
//! is still usable and the operator picks a procedure by hand.

use cleanflow_types::{Catalog, ScanPayload, ValidationError, ValidationResult};

/// Resolve a payload's area and (optional) procedure
pub fn validate(
    payload: &ScanPayload,
    catalog: &dyn Catalog,
) -> Result<ValidationResult, ValidationError> {
    let area = catalog.find_area(payload.area_id()).ok_or_else(|| {
        tracing::debug!(area_id = %payload.area_id(), "Scan rejected: unknown area");
        ValidationError::UnknownArea(payload.area_id().clone())
    })?;

    let result = match payload.procedure_id() {
        None => ValidationResult::valid(area.name, None),
        Some(procedure_id) => match catalog.find_active_procedure(procedure_id) {
            Some(procedure) => ValidationResult::valid(area.name, Some(procedure.name)),
            None => {
                tracing::debug!(
                    area_id = %payload.area_id(),
                    procedure_id = %procedure_id,
                    "Scanned procedure not in active set"
                );
                ValidationResult::unknown_procedure(area.name)
            }
        },
    };

    Ok(result)
}
