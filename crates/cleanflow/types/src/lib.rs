//! Cleanflow Domain Types
//!
//! An operator scans a QR or NFC code identifying a location (and
//! sometimes a procedure), works through a checklist procedure at that
//! location, and submits a verifiable completion record.
//!
//! # Key Concepts
//!
//! - **ScanPayload**: The structured result of decoding a scanned code.
//!   Created only by the scan parser; always carries a non-empty area id.
//! - **ValidationResult**: A payload resolved against the catalog. An
//!   unknown procedure degrades the result, an unknown area rejects it.
//! - **ProcedureInfo**: A named checklist of required and optional steps.
//! - **WorkflowState**: The single live state of one workflow session.
//! - **CleaningRunRecord**: The immutable, submittable artifact produced
//!   when a procedure run is reviewed and confirmed.
//!
//! # Design Principles
//!
//! 1. Payloads and records are immutable once built.
//! 2. Workflow state is owned by exactly one engine and changes only
//!    through events.
//! 3. Every error is recoverable; nothing in the core is fatal.

#![deny(unsafe_code)]

mod catalog;
mod errors;
mod ids;
mod procedure;
mod record;
mod scan;
mod state;

pub use catalog::*;
pub use errors::*;
pub use ids::*;
pub use procedure::*;
pub use record::*;
pub use scan::*;
pub use state::*;
