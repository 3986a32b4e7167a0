//! Background trigger layer: startup, periodic, connectivity and push syncs.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use super::{SyncStatus, SyncWorker};
use crate::config::SyncConfig;
use crate::errors::RetryClass;
use crate::preferences::NotificationChannel;
use crate::resources::ResourceKind;

/// Retry delay cap exponent (5s * 2^8 ~= 21 minutes).
const MAX_BACKOFF_EXPONENT: i32 = 8;
const BASE_BACKOFF_SECONDS: i64 = 5;

/// Exponential backoff in seconds with cap.
pub fn backoff_seconds(consecutive_failures: i32) -> i64 {
    let capped = i64::from(consecutive_failures.clamp(0, MAX_BACKOFF_EXPONENT));
    2_i64.pow(capped as u32) * BASE_BACKOFF_SECONDS
}

/// What caused a sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Startup,
    Periodic,
    NetworkAvailable,
    PushMessage,
    Retry,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    All,
    Kinds(BTreeSet<ResourceKind>),
}

impl SyncScope {
    pub fn kind(kind: ResourceKind) -> Self {
        SyncScope::Kinds(BTreeSet::from([kind]))
    }

    fn merge(self, other: SyncScope) -> SyncScope {
        match (self, other) {
            (SyncScope::Kinds(mut a), SyncScope::Kinds(b)) => {
                a.extend(b);
                SyncScope::Kinds(a)
            }
            _ => SyncScope::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSync {
    trigger: SyncTrigger,
    scope: SyncScope,
}

/// Requests that arrive while a pass runs collapse into one follow-up pass.
#[derive(Default)]
struct SyncRequests {
    pending: Mutex<Option<PendingSync>>,
    notify: Notify,
}

impl SyncRequests {
    fn push(&self, trigger: SyncTrigger, scope: SyncScope) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(match pending.take() {
                Some(existing) => PendingSync {
                    trigger: existing.trigger,
                    scope: existing.scope.merge(scope),
                },
                None => PendingSync { trigger, scope },
            });
        }
        self.notify.notify_one();
    }

    fn take(&self) -> Option<PendingSync> {
        self.pending.lock().ok().and_then(|mut pending| pending.take())
    }
}

/// Keeps the local mirror fresh without a caller driving it.
///
/// A single background loop owns all passes, so at most one pass per kind is
/// ever scheduled at a time.
pub struct SyncScheduler {
    worker: Arc<SyncWorker>,
    config: SyncConfig,
    requests: Arc<SyncRequests>,
    sync_loop: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    watchers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(worker: Arc<SyncWorker>, config: SyncConfig) -> Self {
        Self {
            worker,
            config,
            requests: Arc::new(SyncRequests::default()),
            sync_loop: tokio::sync::Mutex::new(None),
            watchers: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Spawns the background loop (once) and queues a startup sync.
    pub async fn start(&self) {
        let mut sync_loop = self.sync_loop.lock().await;
        if sync_loop
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
        {
            return;
        }

        self.requests.push(SyncTrigger::Startup, SyncScope::All);
        let worker = Arc::clone(&self.worker);
        let requests = Arc::clone(&self.requests);
        let config = self.config.clone();
        *sync_loop = Some(tokio::spawn(run_loop(worker, requests, config)));
        info!("[Scheduler] Background sync started");
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.sync_loop.lock().await.take() {
            handle.abort();
        }
        for handle in self.watchers.lock().await.drain(..) {
            handle.abort();
        }
        info!("[Scheduler] Background sync stopped");
    }

    pub fn request_sync(&self, trigger: SyncTrigger, scope: SyncScope) {
        debug!("[Scheduler] Sync requested by {:?} for {:?}", trigger, scope);
        self.requests.push(trigger, scope);
    }

    /// Handles a push message on `topic`: a known channel topic syncs that
    /// kind, anything else syncs everything.
    pub fn on_push_message(&self, topic: &str) {
        let scope = NotificationChannel::from_topic(topic)
            .map(|channel| SyncScope::kind(channel.resource_kind()))
            .unwrap_or(SyncScope::All);
        self.request_sync(SyncTrigger::PushMessage, scope);
    }

    /// Requests a sync every time `online` flips from `false` to `true`.
    ///
    /// The value seen at call time is the baseline. Works before or after
    /// [`start`](Self::start); requests queue until the loop runs.
    pub async fn watch_connectivity(&self, mut online: watch::Receiver<bool>) {
        let requests = Arc::clone(&self.requests);
        let mut was_online = *online.borrow_and_update();
        let handle = tokio::spawn(async move {
            while online.changed().await.is_ok() {
                let is_online = *online.borrow_and_update();
                if is_online && !was_online {
                    debug!("[Scheduler] Network became available");
                    requests.push(SyncTrigger::NetworkAvailable, SyncScope::All);
                }
                was_online = is_online;
            }
        });
        self.watchers.lock().await.push(handle);
    }
}

async fn run_loop(worker: Arc<SyncWorker>, requests: Arc<SyncRequests>, config: SyncConfig) {
    let mut consecutive_failures: i32 = 0;
    let mut delay = next_periodic_delay(&config);

    loop {
        let request = tokio::select! {
            _ = requests.notify.notified() => requests.take(),
            _ = tokio::time::sleep(delay) => None,
        };
        let request = request.unwrap_or(PendingSync {
            trigger: if consecutive_failures > 0 {
                SyncTrigger::Retry
            } else {
                SyncTrigger::Periodic
            },
            scope: SyncScope::All,
        });

        debug!(
            "[Scheduler] Running {:?} sync for {:?}",
            request.trigger, request.scope
        );
        let status = match &request.scope {
            SyncScope::All => worker.sync(None).await,
            SyncScope::Kinds(kinds) => worker.sync(Some(kinds)).await,
        };

        match status {
            SyncStatus::Synced => {
                consecutive_failures = 0;
                delay = next_periodic_delay(&config);
            }
            SyncStatus::Failed(RetryClass::Retryable) => {
                let backoff = backoff_seconds(consecutive_failures);
                consecutive_failures = consecutive_failures.saturating_add(1);
                delay = Duration::from_secs(backoff as u64);
                warn!(
                    "[Scheduler] {:?} sync failed ({} in a row), retrying in {}s",
                    request.trigger, consecutive_failures, backoff
                );
            }
            SyncStatus::Failed(RetryClass::Permanent) => {
                consecutive_failures = 0;
                delay = next_periodic_delay(&config);
                warn!(
                    "[Scheduler] {:?} sync failed permanently, waiting {}s for the next periodic sync",
                    request.trigger,
                    delay.as_secs()
                );
            }
        }
    }
}

fn next_periodic_delay(config: &SyncConfig) -> Duration {
    let jitter_bound = config.interval_jitter.as_millis() as u64;
    let jitter_ms = if jitter_bound > 0 {
        rand::thread_rng().gen_range(0..=jitter_bound)
    } else {
        0
    };
    config.sync_interval + Duration::from_millis(jitter_ms)
}
