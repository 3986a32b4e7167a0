//! Seams between the synchronizer and its collaborators.

use async_trait::async_trait;

use super::{AppliedChanges, ChangeBatch, ChangeListEntry, ChangeListVersions, SyncStatus};
use crate::errors::Result;
use crate::preferences::PreferencesDataSource;
use crate::resources::{Resource, ResourceKind};

/// Remote source of full payloads and change lists for one resource kind.
#[async_trait]
pub trait ResourceNetworkDataSource<R: Resource>: Send + Sync {
    /// Full payloads for `ids`, or every resource when `ids` is `None`.
    async fn get_resources(&self, ids: Option<&[String]>) -> Result<Vec<R>>;

    /// Change-list entries with a version strictly greater than `after`, or
    /// the whole change list when `after` is `None`.
    async fn get_change_list(&self, after: Option<i64>) -> Result<Vec<ChangeListEntry>>;
}

/// Write side of the relational store for one resource kind.
#[async_trait]
pub trait ResourceWriter<R: Resource>: Send + Sync {
    /// Applies deletes and upserts (with their search shadow rows) atomically.
    async fn apply_changes(&self, batch: ChangeBatch<R>) -> Result<AppliedChanges>;
}

/// Owner of the durable change-list cursors.
#[async_trait]
pub trait Synchronizer: Send + Sync {
    fn get_change_list_versions(&self) -> ChangeListVersions;

    /// Moves the cursor of `kind` from `expected` to `new`; `Ok(false)` when
    /// the stored cursor no longer matches `expected`.
    async fn advance_cursor(&self, kind: ResourceKind, expected: i64, new: i64) -> Result<bool>;
}

/// Something that can bring one resource kind up to date.
#[async_trait]
pub trait Syncable: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Runs one pass and reports how it ended.
    async fn sync_status(&self, synchronizer: &dyn Synchronizer) -> SyncStatus;

    /// Runs one pass; never panics or errors past this boundary.
    async fn sync_with(&self, synchronizer: &dyn Synchronizer) -> bool {
        self.sync_status(synchronizer).await.is_synced()
    }
}

#[async_trait]
impl Synchronizer for PreferencesDataSource {
    fn get_change_list_versions(&self) -> ChangeListVersions {
        PreferencesDataSource::get_change_list_versions(self)
    }

    async fn advance_cursor(&self, kind: ResourceKind, expected: i64, new: i64) -> Result<bool> {
        self.compare_and_set_cursor(kind, expected, new).await
    }
}
