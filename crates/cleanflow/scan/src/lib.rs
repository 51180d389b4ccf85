//! Cleanflow scan decoding
//!
//! Two steps turn a scanned code into something the workflow can use:
//!
//! - [`parser`] decodes the raw string into a [`ScanPayload`]
//!   (purely syntactic, one pass per scan source)
//! - [`validator`] resolves that payload against a [`Catalog`]
//!
//! [`scan`] runs both.
//!
//! # Example
//!
//! ```rust
//! use cleanflow_scan::parser;
//! use cleanflow_types::ScanSource;
//!
//! let payload = parser::parse(ScanSource::Qr, "CF-AREA-room-1-PROTOCOL-protocol-1").unwrap();
//! assert_eq!(payload.area_id().as_str(), "room-1");
//! assert_eq!(payload.procedure_id().unwrap().as_str(), "protocol-1");
//! ```

#![deny(unsafe_code)]

pub mod parser;
pub mod validator;

pub use parser::parse;
pub use validator::validate;

use cleanflow_types::{Catalog, ScanError, ScanPayload, ScanSource, ScannedArea};

/// Decode and validate a raw scan in one call
pub fn scan(source: ScanSource, raw: &str, catalog: &dyn Catalog) -> Result<ScannedArea, ScanError> {
    let payload: ScanPayload = parse(source, raw)?;
    let validation = validate(&payload, catalog)?;
    Ok(ScannedArea::new(payload, validation))
}
