//! Per-kind change-list synchronization pass.

use std::time::Instant;

use log::{debug, info, warn};

use super::{
    ChangeBatch, ChangeListEntry, ChangePlan, ResourceNetworkDataSource, ResourceWriter,
    SyncOutcome, SyncPhase, SyncStatus, Synchronizer, NEVER_SYNCED,
};
use crate::errors::{Error, Result};
use crate::resources::{Resource, ResourceKind};

/// Tracks the phase of one pass for logging.
struct SyncPass {
    kind: ResourceKind,
    phase: SyncPhase,
    started_at: Instant,
}

impl SyncPass {
    fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            phase: SyncPhase::Idle,
            started_at: Instant::now(),
        }
    }

    fn enter(&mut self, phase: SyncPhase) {
        debug!(
            "[Sync] {} pass {:?} -> {:?} after {}ms",
            self.kind,
            self.phase,
            phase,
            self.started_at.elapsed().as_millis()
        );
        self.phase = phase;
    }
}

/// Brings the local store for `R` up to date with the backend change list.
///
/// The cursor is the last thing written: any failure before it (network,
/// storage, an overlapping pass) leaves it where it was and reports the
/// failure with its retry class, so the next call retries the same range. Deletes and upserts are
/// idempotent by id, which makes that retry safe.
pub async fn change_list_sync<R, N, W>(
    synchronizer: &dyn Synchronizer,
    network: &N,
    writer: &W,
) -> SyncStatus
where
    R: Resource,
    N: ResourceNetworkDataSource<R> + ?Sized,
    W: ResourceWriter<R> + ?Sized,
{
    let mut pass = SyncPass::new(R::KIND);
    match run_pass(&mut pass, synchronizer, network, writer).await {
        Ok(outcome) => {
            pass.enter(SyncPhase::Done);
            if outcome.cursor != outcome.previous_cursor || outcome.bootstrap {
                info!(
                    "[Sync] {} synced: cursor {} -> {} upserted={} deleted={} bootstrap={} in {}ms",
                    outcome.kind,
                    outcome.previous_cursor,
                    outcome.cursor,
                    outcome.applied.upserted,
                    outcome.applied.deleted,
                    outcome.bootstrap,
                    pass.started_at.elapsed().as_millis()
                );
            }
            SyncStatus::Synced
        }
        Err(err) => {
            let failed_in = pass.phase;
            pass.enter(SyncPhase::Failed);
            warn!(
                "[Sync] {} pass failed during {:?}, cursor unchanged: {}",
                R::KIND,
                failed_in,
                err
            );
            SyncStatus::Failed(err.retry_class())
        }
    }
}

async fn run_pass<R, N, W>(
    pass: &mut SyncPass,
    synchronizer: &dyn Synchronizer,
    network: &N,
    writer: &W,
) -> Result<SyncOutcome>
where
    R: Resource,
    N: ResourceNetworkDataSource<R> + ?Sized,
    W: ResourceWriter<R> + ?Sized,
{
    let kind = R::KIND;
    let cursor = synchronizer.get_change_list_versions().get(kind);
    let bootstrap = cursor <= NEVER_SYNCED;

    pass.enter(SyncPhase::FetchingChanges);
    let entries = if bootstrap {
        network.get_change_list(None).await?
    } else {
        let fetched = network.get_change_list(Some(cursor)).await?;
        fetched
            .into_iter()
            .filter(|entry| entry.change_list_version > cursor)
            .collect()
    };
    warn_if_unordered(kind, &entries);

    if !bootstrap && entries.is_empty() {
        debug!("[Sync] {} already at version {}", kind, cursor);
        return Ok(SyncOutcome {
            kind,
            bootstrap,
            previous_cursor: cursor,
            cursor,
            applied: Default::default(),
        });
    }

    let plan = ChangePlan::from_entries(&entries);

    pass.enter(SyncPhase::FetchingPayloads);
    let batch = if bootstrap {
        let resources = network.get_resources(None).await?;
        ChangeBatch::new(resources, plan.deleted_ids)
    } else if plan.updated_ids.is_empty() {
        ChangeBatch::new(Vec::new(), plan.deleted_ids)
    } else {
        let resources = network
            .get_resources(Some(plan.updated_ids.as_slice()))
            .await?;
        if resources.len() < plan.updated_ids.len() {
            debug!(
                "[Sync] {} change list named {} updates, backend returned {}",
                kind,
                plan.updated_ids.len(),
                resources.len()
            );
        }
        ChangeBatch::new(resources, plan.deleted_ids)
    };

    pass.enter(SyncPhase::Writing);
    let applied = if batch.is_empty() {
        Default::default()
    } else {
        writer.apply_changes(batch).await?
    };

    let next_cursor = plan.max_version.unwrap_or(0).max(cursor);
    if !synchronizer
        .advance_cursor(kind, cursor, next_cursor)
        .await?
    {
        return Err(Error::Sync(format!(
            "{} cursor moved during the pass (expected {}), leaving it for the next run",
            kind, cursor
        )));
    }

    Ok(SyncOutcome {
        kind,
        bootstrap,
        previous_cursor: cursor,
        cursor: next_cursor,
        applied,
    })
}

fn warn_if_unordered(kind: ResourceKind, entries: &[ChangeListEntry]) {
    if entries
        .windows(2)
        .any(|pair| pair[1].change_list_version < pair[0].change_list_version)
    {
        warn!(
            "[Sync] {} change list is not ordered by version; using the highest version seen",
            kind
        );
    }
}
