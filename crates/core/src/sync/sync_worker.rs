//! Runs every registered syncable and reports one overall result.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::{watch, Mutex};

use super::{DataChangedPulse, SyncStatus, Syncable, Synchronizer};
use crate::errors::RetryClass;
use crate::resources::ResourceKind;

/// Composes per-kind sync passes.
///
/// Each kind runs behind its own mutex, so overlapping requests for the same
/// kind queue instead of interleaving cursor writes; different kinds run
/// concurrently.
pub struct SyncWorker {
    synchronizer: Arc<dyn Synchronizer>,
    syncables: Vec<Arc<dyn Syncable>>,
    kind_locks: HashMap<ResourceKind, Arc<Mutex<()>>>,
    data_changed: DataChangedPulse,
    syncing: watch::Sender<bool>,
    in_flight: AtomicUsize,
}

/// Keeps `is_syncing` raised while any pass is running, including passes whose
/// future is dropped mid-way.
struct InFlightGuard<'a> {
    worker: &'a SyncWorker,
}

impl<'a> InFlightGuard<'a> {
    fn enter(worker: &'a SyncWorker) -> Self {
        if worker.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            worker.syncing.send_replace(true);
        }
        Self { worker }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.worker.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.worker.syncing.send_replace(false);
        }
    }
}

impl SyncWorker {
    pub fn new(
        synchronizer: Arc<dyn Synchronizer>,
        syncables: Vec<Arc<dyn Syncable>>,
        data_changed: DataChangedPulse,
    ) -> Self {
        let kind_locks = syncables
            .iter()
            .map(|syncable| (syncable.kind(), Arc::new(Mutex::new(()))))
            .collect();
        let (syncing, _) = watch::channel(false);
        Self {
            synchronizer,
            syncables,
            kind_locks,
            data_changed,
            syncing,
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn data_changed(&self) -> &DataChangedPulse {
        &self.data_changed
    }

    pub fn is_syncing(&self) -> watch::Receiver<bool> {
        self.syncing.subscribe()
    }

    /// Syncs every kind; `true` only if all of them succeeded.
    pub async fn sync_all(&self) -> bool {
        self.sync(None).await.is_synced()
    }

    /// Syncs the given kinds; `true` only if all of them succeeded.
    pub async fn sync_kinds(&self, kinds: &BTreeSet<ResourceKind>) -> bool {
        self.sync(Some(kinds)).await.is_synced()
    }

    /// Syncs `kinds` (every kind when `None`) and reports the combined status.
    pub async fn sync(&self, kinds: Option<&BTreeSet<ResourceKind>>) -> SyncStatus {
        self.run(|kind| kinds.map_or(true, |kinds| kinds.contains(&kind)))
            .await
    }

    async fn run(&self, selected: impl Fn(ResourceKind) -> bool) -> SyncStatus {
        let _in_flight = InFlightGuard::enter(self);
        let passes = self
            .syncables
            .iter()
            .filter(|syncable| selected(syncable.kind()))
            .map(|syncable| self.run_one(syncable.as_ref()));
        let results = join_all(passes).await;

        let status = results
            .iter()
            .fold(SyncStatus::Synced, |overall, status| overall.combine(*status));
        if results.is_empty() {
            debug!("[Sync] Nothing selected to sync");
        } else if status.is_synced() {
            info!("[Sync] {} kind(s) in sync", results.len());
            self.data_changed.pulse();
        } else {
            warn!(
                "[Sync] {}/{} kind(s) failed: {:?}",
                results.iter().filter(|status| !status.is_synced()).count(),
                results.len(),
                status
            );
        }
        status
    }

    async fn run_one(&self, syncable: &dyn Syncable) -> SyncStatus {
        let kind = syncable.kind();
        let lock = match self.kind_locks.get(&kind) {
            Some(lock) => Arc::clone(lock),
            None => return SyncStatus::Failed(RetryClass::Permanent),
        };
        let _guard = lock.lock().await;
        syncable.sync_status(self.synchronizer.as_ref()).await
    }
}
