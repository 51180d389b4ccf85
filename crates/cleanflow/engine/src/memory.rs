//! In-memory collaborators for development and testing.
//!
//! Provides simple implementations of the catalog, repository, clock and
//! id generator traits. The catalog and repository are not meant for
//! production use.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use cleanflow_types::{AreaId, AreaInfo, CleaningRunRecord, ProcedureInfo, RunId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::collaborators::{Catalog, Clock, IdGenerator, Repository, RepositoryError};

// ── Catalog ──────────────────────────────────────────────────────────

/// Fixed catalog built up front.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    areas: HashMap<AreaId, AreaInfo>,
    /// Procedures in registration order
    procedures: Vec<ProcedureInfo>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_area(mut self, area: AreaInfo) -> Self {
        self.areas.insert(area.id.clone(), area);
        self
    }

    /// Register a procedure; a later procedure with the same id replaces it.
    pub fn with_procedure(mut self, procedure: ProcedureInfo) -> Self {
        self.procedures.retain(|p| p.id != procedure.id);
        self.procedures.push(procedure);
        self
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }
}

impl Catalog for InMemoryCatalog {
    fn find_area(&self, area_id: &AreaId) -> Option<AreaInfo> {
        self.areas.get(area_id).cloned()
    }

    fn active_procedures(&self) -> Vec<ProcedureInfo> {
        self.procedures
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect()
    }
}

// ── Repository ───────────────────────────────────────────────────────

/// In-memory run record store.
///
/// Can be told to fail the next N saves or to delay every save, which
/// is how tests exercise resubmission and in-flight behaviour.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    /// Persisted records indexed by run id.
    records: Arc<DashMap<RunId, CleaningRunRecord>>,

    /// Every call to `save`, successful or not.
    save_attempts: AtomicUsize,

    /// Remaining saves that should fail.
    failures_remaining: AtomicUsize,

    /// Artificial latency applied to each save.
    latency: Option<std::time::Duration>,
}

impl InMemoryRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every save by `latency`.
    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next `count` saves fail with [`RepositoryError::Unavailable`].
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }

    /// Number of persisted records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RunId) -> Option<CleaningRunRecord> {
        self.records.get(id).map(|r| r.clone())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn save(&self, record: &CleaningRunRecord) -> Result<(), RepositoryError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(RepositoryError::Unavailable("simulated outage".into()));
        }

        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn find(&self, id: &RunId) -> Result<Option<CleaningRunRecord>, RepositoryError> {
        Ok(self.get(id))
    }

    async fn list_for_area(
        &self,
        area_id: &AreaId,
    ) -> Result<Vec<CleaningRunRecord>, RepositoryError> {
        let mut records: Vec<CleaningRunRecord> = self
            .records
            .iter()
            .filter(|r| &r.area_id == area_id)
            .map(|r| r.value().clone())
            .collect();

        // Newest first
        records.sort_by(|a, b| b.end_time.cmp(&a.end_time));
        Ok(records)
    }
}

// ── Clocks ───────────────────────────────────────────────────────────

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.write() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.write() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// ── Id generators ────────────────────────────────────────────────────

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// `prefix-1`, `prefix-2`, ... for deterministic tests.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn new_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}
