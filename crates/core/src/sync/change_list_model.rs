//! Change-list cursor, entries and batch types used by incremental sync.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::errors::RetryClass;
use crate::resources::{Resource, ResourceKind};

/// Cursor value meaning "this kind was never synced".
pub const NEVER_SYNCED: i64 = -1;

/// Last fully applied change-list version per resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangeListVersions {
    pub news_resource_version: i64,
    pub transfer_resource_version: i64,
}

impl Default for ChangeListVersions {
    fn default() -> Self {
        Self {
            news_resource_version: NEVER_SYNCED,
            transfer_resource_version: NEVER_SYNCED,
        }
    }
}

impl ChangeListVersions {
    pub fn get(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::News => self.news_resource_version,
            ResourceKind::Transfer => self.transfer_resource_version,
        }
    }

    pub fn with(mut self, kind: ResourceKind, version: i64) -> Self {
        match kind {
            ResourceKind::News => self.news_resource_version = version,
            ResourceKind::Transfer => self.transfer_resource_version = version,
        }
        self
    }
}

/// One entry of a backend change list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeListEntry {
    pub id: String,
    pub change_list_version: i64,
    pub is_delete: bool,
}

/// What a fetched change list asks the local store to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangePlan {
    pub updated_ids: Vec<String>,
    pub deleted_ids: Vec<String>,
    pub max_version: Option<i64>,
}

impl ChangePlan {
    /// The highest-version entry for an id decides whether it is updated or
    /// deleted; ids keep the order of their deciding entry.
    pub fn from_entries(entries: &[ChangeListEntry]) -> Self {
        let mut latest: BTreeMap<&str, (i64, usize, bool)> = BTreeMap::new();
        for (position, entry) in entries.iter().enumerate() {
            let candidate = (entry.change_list_version, position, entry.is_delete);
            latest
                .entry(entry.id.as_str())
                .and_modify(|current| {
                    if (candidate.0, candidate.1) >= (current.0, current.1) {
                        *current = candidate;
                    }
                })
                .or_insert(candidate);
        }

        let mut decided: Vec<(usize, &str, bool)> = latest
            .into_iter()
            .map(|(id, (_, position, is_delete))| (position, id, is_delete))
            .collect();
        decided.sort_unstable();

        let mut plan = ChangePlan {
            max_version: entries.iter().map(|e| e.change_list_version).max(),
            ..Default::default()
        };
        for (_, id, is_delete) in decided {
            if is_delete {
                plan.deleted_ids.push(id.to_string());
            } else {
                plan.updated_ids.push(id.to_string());
            }
        }
        plan
    }
}

/// A set of writes the store must apply in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch<R> {
    pub upserts: Vec<R>,
    pub deleted_ids: Vec<String>,
}

impl<R: Resource> ChangeBatch<R> {
    /// Collapses duplicate upserts (last one wins) and drops deletes for ids
    /// that are also upserted.
    pub fn new(upserts: Vec<R>, deleted_ids: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let mut deduped: Vec<R> = upserts
            .into_iter()
            .rev()
            .filter(|resource| seen.insert(resource.id().to_string()))
            .collect();
        deduped.reverse();

        let mut deleted_seen = HashSet::new();
        let deleted_ids = deleted_ids
            .into_iter()
            .filter(|id| !seen.contains(id) && deleted_seen.insert(id.clone()))
            .collect();

        Self {
            upserts: deduped,
            deleted_ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deleted_ids.is_empty()
    }
}

/// Row counts a store reports after applying a [`ChangeBatch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedChanges {
    pub upserted: usize,
    pub deleted: usize,
}

/// Steps of one per-kind sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    FetchingChanges,
    FetchingPayloads,
    Writing,
    Done,
    Failed,
}

/// How a pass ended, as far as scheduling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    Failed(RetryClass),
}

impl SyncStatus {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }

    /// Overall status of several passes: any retryable failure makes the
    /// whole run worth retrying.
    pub fn combine(self, other: SyncStatus) -> SyncStatus {
        match (self, other) {
            (SyncStatus::Synced, status) | (status, SyncStatus::Synced) => status,
            (SyncStatus::Failed(RetryClass::Retryable), _)
            | (_, SyncStatus::Failed(RetryClass::Retryable)) => {
                SyncStatus::Failed(RetryClass::Retryable)
            }
            _ => SyncStatus::Failed(RetryClass::Permanent),
        }
    }
}

/// Result of a successful per-kind pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub kind: ResourceKind,
    pub bootstrap: bool,
    pub previous_cursor: i64,
    pub cursor: i64,
    pub applied: AppliedChanges,
}
