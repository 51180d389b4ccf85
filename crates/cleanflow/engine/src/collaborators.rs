//! External collaborators the engine depends on
//!
//! All of them are injected through [`Collaborators`] when an engine is
//! built; nothing is looked up from global state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cleanflow_types::{AreaId, CleaningRunRecord, RunId};
use std::sync::Arc;

pub use cleanflow_types::Catalog;

/// Errors reported by a [`Repository`] implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// Store not reachable (network down, service unavailable)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Store reachable but refused the write
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Remote document store for run records
#[async_trait]
pub trait Repository: Send + Sync {
    /// Persist a run record. Saving the same record id twice overwrites it.
    async fn save(&self, record: &CleaningRunRecord) -> Result<(), RepositoryError>;

    /// Load a previously saved record
    async fn find(&self, id: &RunId) -> Result<Option<CleaningRunRecord>, RepositoryError>;

    /// All records saved for an area, newest first
    async fn list_for_area(
        &self,
        area_id: &AreaId,
    ) -> Result<Vec<CleaningRunRecord>, RepositoryError>;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of fresh unique ids
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// The injected dependencies of a workflow engine.
///
/// Cloning is cheap; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn Catalog>,
    pub repository: Arc<dyn Repository>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
}

impl Collaborators {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        repository: Arc<dyn Repository>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            catalog,
            repository,
            clock,
            ids,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
