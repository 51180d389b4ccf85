//! Cleanflow Workflow Engine
//!
//! Drives one operator session from a scanned code to a persisted,
//! scored cleaning run record.
//!
//! # Architecture
//!
//! The [`WorkflowEngine`] composes specialized components:
//!
//! - [`StateMachine`]: Legal transitions between workflow states
//! - [`scorer`]: Compliance score of a procedure run
//! - [`assembler`]: Freezes a reviewed run into a record
//! - [`SubmissionCoordinator`]: At most one save in flight per session
//! - [`SessionJournal`]: Bounded audit trail of the session
//!
//! Collaborators (catalog, repository, clock, id generator) are injected
//! through [`Collaborators`]; [`memory`] has in-memory versions.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cleanflow_engine::memory::*;
//! use cleanflow_engine::{Collaborators, EngineConfig, WorkflowEngine};
//! use cleanflow_types::*;
//!
//! let catalog = InMemoryCatalog::new()
//!     .with_area(AreaInfo::new("room-1", "Operating Room 1"))
//!     .with_procedure(
//!         ProcedureInfo::new("protocol-1", "OR Suite Protocol A")
//!             .with_step(ProcedureStep::required("s1", "Remove waste")),
//!     );
//! let collaborators = Collaborators::new(
//!     Arc::new(catalog),
//!     Arc::new(InMemoryRepository::new()),
//!     Arc::new(SystemClock),
//!     Arc::new(UuidGenerator),
//! );
//! let mut engine = WorkflowEngine::new(
//!     collaborators,
//!     Operator::new("op-1", "Dana"),
//!     EngineConfig::default(),
//! );
//!
//! engine.scan(ScanSource::Qr, "CF-AREA-room-1-PROTOCOL-protocol-1").unwrap();
//! engine.complete_step(StepId::new("s1")).unwrap();
//! engine.request_review().unwrap();
//! assert_eq!(engine.state().name(), "review");
//! ```

#![deny(unsafe_code)]

pub mod assembler;
pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod journal;
pub mod memory;
pub mod scorer;
pub mod state_machine;

// Re-export main types
pub use collaborators::{Catalog, Clock, Collaborators, IdGenerator, Repository, RepositoryError};
pub use config::EngineConfig;
pub use coordinator::{SubmissionCoordinator, SubmissionOutcome, SubmissionTicket};
pub use engine::{SubmissionStatus, WorkflowEngine};
pub use journal::{JournalEntry, JournalEventType, SessionJournal};
pub use state_machine::{StateMachine, Transition, WorkflowEvent};
