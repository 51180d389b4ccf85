//! Read-only catalog of known areas and active procedures

use crate::{AreaId, AreaInfo, ProcedureId, ProcedureInfo};

/// External source of areas and procedures.
///
/// Access is read-only and may happen concurrently from many sessions.
pub trait Catalog: Send + Sync {
    /// Look up an area by id
    fn find_area(&self, area_id: &AreaId) -> Option<AreaInfo>;

    /// Procedures that may currently be started
    fn active_procedures(&self) -> Vec<ProcedureInfo>;

    /// Find a procedure by id within the active set
    fn find_active_procedure(&self, procedure_id: &ProcedureId) -> Option<ProcedureInfo> {
        self.active_procedures()
            .into_iter()
            .find(|p| &p.id == procedure_id)
    }
}
