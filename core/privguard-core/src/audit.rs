//! Audit recorder — append-only writes and filtered reads over the
//! audit store.

use crate::error::CoreResult;
use chrono::Utc;
use privguard_storage::{AuditFilter, AuditStore};
use privguard_types::{AuditEntry, AuditRecord};
use tracing::warn;

/// Records and queries audit rows. Cheap to clone; all clones share the
/// underlying store.
#[derive(Clone)]
pub struct AuditRecorder {
    store: AuditStore,
}

impl AuditRecorder {
    pub fn new(store: AuditStore) -> Self {
        Self { store }
    }

    /// Appends an entry, stamping a strictly increasing id and the
    /// current time.
    pub fn record(&self, entry: AuditEntry) -> CoreResult<AuditRecord> {
        Ok(self.store.append(&entry, Utc::now())?)
    }

    /// Best-effort append for paths that are already failing: the audit
    /// write must not mask the original error, so a failure here only
    /// logs.
    pub fn record_best_effort(&self, entry: AuditEntry) {
        if let Err(e) = self.record(entry) {
            warn!("failed to write audit record: {e}");
        }
    }

    /// Filtered query, newest first, plus the total matching count.
    pub fn query(
        &self,
        filter: &AuditFilter,
        limit: usize,
        offset: usize,
    ) -> CoreResult<(Vec<AuditRecord>, i64)> {
        let records = self.store.query(filter, limit, offset)?;
        let total = self.store.count(filter)?;
        Ok((records, total))
    }
}
