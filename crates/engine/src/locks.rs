//! Per-KPI write serialization.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Idle entries are dropped once the table grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per KPI id, created on demand.
///
/// Conversion recording holds the guard from the de-duplication check
/// through the weight write, and KPI deletes take it too, so work on the
/// same KPI runs one step at a time. Not reentrant.
#[derive(Default)]
pub struct KpiLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl KpiLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, kpi_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, l| Arc::strong_count(l) > 1);
            }
            locks.entry(kpi_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
