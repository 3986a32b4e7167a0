//! In-memory fakes for the storage and network ports.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::watch;

use crate::data::ResourceDao;
use crate::errors::{DatabaseError, NetworkFailure, Result, RetryClass};
use crate::resources::{NewsResource, Resource, TransferResource};
use crate::sync::{
    AppliedChanges, ChangeBatch, ChangeListEntry, ResourceNetworkDataSource, ResourceWriter,
};

pub fn news(id: &str, hours: i64) -> NewsResource {
    NewsResource {
        id: id.to_string(),
        title: format!("Headline {id}"),
        content: format!("Body {id}"),
        category: "0".to_string(),
        is_important: false,
        author_name: Some("Desk".to_string()),
        author_image_url: None,
        url: format!("https://example.test/news/{id}"),
        topics: vec!["league".to_string()],
        header_image_url: None,
        publish_date: Utc
            .timestamp_opt(1_700_000_000 + hours * 3600, 0)
            .single()
            .expect("timestamp"),
    }
}

pub fn transfer(id: &str) -> TransferResource {
    TransferResource {
        id: id.to_string(),
        player_name: format!("Player {id}"),
        club_from: "Old Club".to_string(),
        club_from_image_url: None,
        club_to: "New Club".to_string(),
        club_to_image_url: None,
        price: "Free".to_string(),
        url: format!("https://example.test/transfers/{id}"),
    }
}

/// What the fakes need to mimic ordering and the search index.
pub trait FakeRow: Resource {
    fn search_text(&self) -> String;
    fn recency(&self) -> i64;
}

impl FakeRow for NewsResource {
    fn search_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }

    fn recency(&self) -> i64 {
        self.publish_date.timestamp_millis()
    }
}

impl FakeRow for TransferResource {
    fn search_text(&self) -> String {
        format!("{} {} {}", self.player_name, self.club_from, self.club_to)
    }

    fn recency(&self) -> i64 {
        self.id.parse().unwrap_or(0)
    }
}

/// Tokens are prefixes, all required, case-insensitive.
fn matches(text: &str, query: &str) -> bool {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(|t| t.replace('"', "").to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    !tokens.is_empty()
        && tokens
            .iter()
            .all(|token| words.iter().any(|word| word.starts_with(token.as_str())))
}

/// Resource table plus search shadow kept in one lock, like one transaction.
pub struct InMemoryDao<R> {
    tables: Mutex<(BTreeMap<String, R>, BTreeMap<String, String>)>,
    changes: watch::Sender<u64>,
    fail_reads: AtomicBool,
    failing_writes: AtomicUsize,
    writes: AtomicUsize,
}

impl<R: FakeRow> InMemoryDao<R> {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            tables: Mutex::new((BTreeMap::new(), BTreeMap::new())),
            changes,
            fail_reads: AtomicBool::new(false),
            failing_writes: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn seed(&self, rows: Vec<R>) {
        {
            let mut tables = self.tables.lock().expect("tables");
            for row in rows {
                tables.1.insert(row.id().to_string(), row.search_text());
                tables.0.insert(row.id().to_string(), row);
            }
        }
        self.changes.send_modify(|generation| *generation += 1);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// The next `count` writes fail without touching the tables.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Committed `apply_changes` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn ids(&self) -> BTreeSet<String> {
        self.tables.lock().expect("tables").0.keys().cloned().collect()
    }

    pub fn shadow_ids(&self) -> BTreeSet<String> {
        self.tables.lock().expect("tables").1.keys().cloned().collect()
    }

    pub fn row(&self, id: &str) -> Option<R> {
        self.tables.lock().expect("tables").0.get(id).cloned()
    }

    fn read<T>(
        &self,
        read: impl FnOnce(&BTreeMap<String, R>, &BTreeMap<String, String>) -> T,
    ) -> Result<T> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryFailed("injected read failure".to_string()).into());
        }
        let tables = self.tables.lock().expect("tables");
        Ok(read(&tables.0, &tables.1))
    }

    fn ordered(rows: impl Iterator<Item = R>) -> Vec<R> {
        let mut rows: Vec<R> = rows.collect();
        rows.sort_by_key(|row| std::cmp::Reverse(row.recency()));
        rows
    }
}

#[async_trait]
impl<R: FakeRow> ResourceWriter<R> for InMemoryDao<R> {
    async fn apply_changes(&self, batch: ChangeBatch<R>) -> Result<AppliedChanges> {
        let pending = self.failing_writes.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_writes.store(pending - 1, Ordering::SeqCst);
            return Err(DatabaseError::QueryFailed("injected write failure".to_string()).into());
        }

        let mut applied = AppliedChanges::default();
        {
            let mut tables = self.tables.lock().expect("tables");
            for id in &batch.deleted_ids {
                tables.1.remove(id);
                if tables.0.remove(id).is_some() {
                    applied.deleted += 1;
                }
            }
            for row in batch.upserts {
                tables.1.insert(row.id().to_string(), row.search_text());
                tables.0.insert(row.id().to_string(), row);
                applied.upserted += 1;
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.changes.send_modify(|generation| *generation += 1);
        Ok(applied)
    }
}

impl<R: FakeRow> ResourceDao<R> for InMemoryDao<R> {
    fn get_resource(&self, id: &str) -> Result<Option<R>> {
        self.read(|rows, _| rows.get(id).cloned())
    }

    fn get_resources(&self, filter_ids: Option<&BTreeSet<String>>) -> Result<Vec<R>> {
        self.read(|rows, _| {
            Self::ordered(
                rows.values()
                    .filter(|row| filter_ids.map_or(true, |ids| ids.contains(row.id())))
                    .cloned(),
            )
        })
    }

    fn get_resources_page(&self, limit: i64, offset: i64) -> Result<Vec<R>> {
        self.read(|rows, _| {
            Self::ordered(rows.values().cloned())
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .collect()
        })
    }

    fn count(&self) -> Result<i64> {
        self.read(|rows, _| rows.len() as i64)
    }

    fn search_ids(&self, query: &str) -> Result<Vec<String>> {
        self.read(|_, shadow| {
            shadow
                .iter()
                .filter(|(_, text)| matches(text, query))
                .map(|(id, _)| id.clone())
                .collect()
        })
    }

    fn search_count(&self) -> Result<i64> {
        self.read(|_, shadow| shadow.len() as i64)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}

/// Backend double: a versioned change list plus the current payloads.
pub struct FakeNetwork<R> {
    state: Mutex<NetworkState<R>>,
    failing_calls: AtomicUsize,
    permanent_failures: AtomicBool,
}

struct NetworkState<R> {
    payloads: BTreeMap<String, R>,
    change_list: Vec<ChangeListEntry>,
    payload_requests: Vec<Option<Vec<String>>>,
    change_list_requests: Vec<Option<i64>>,
}

impl<R: Resource> FakeNetwork<R> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(NetworkState {
                payloads: BTreeMap::new(),
                change_list: Vec::new(),
                payload_requests: Vec::new(),
                change_list_requests: Vec::new(),
            }),
            failing_calls: AtomicUsize::new(0),
            permanent_failures: AtomicBool::new(false),
        }
    }

    /// Publishes (or republishes) `resource` at `version`.
    pub fn upsert(&self, resource: R, version: i64) {
        let mut state = self.state.lock().expect("network");
        state.change_list.push(ChangeListEntry {
            id: resource.id().to_string(),
            change_list_version: version,
            is_delete: false,
        });
        state.payloads.insert(resource.id().to_string(), resource);
    }

    pub fn delete(&self, id: &str, version: i64) {
        let mut state = self.state.lock().expect("network");
        state.change_list.push(ChangeListEntry {
            id: id.to_string(),
            change_list_version: version,
            is_delete: true,
        });
        state.payloads.remove(id);
    }

    /// The next `count` requests of any kind fail.
    pub fn fail_next_calls(&self, count: usize) {
        self.permanent_failures.store(false, Ordering::SeqCst);
        self.failing_calls.store(count, Ordering::SeqCst);
    }

    /// Like [`Self::fail_next_calls`], with failures no retry can fix.
    pub fn reject_next_calls(&self, count: usize) {
        self.permanent_failures.store(true, Ordering::SeqCst);
        self.failing_calls.store(count, Ordering::SeqCst);
    }

    pub fn payload_requests(&self) -> Vec<Option<Vec<String>>> {
        self.state.lock().expect("network").payload_requests.clone()
    }

    pub fn change_list_requests(&self) -> Vec<Option<i64>> {
        self.state.lock().expect("network").change_list_requests.clone()
    }

    fn check_failure(&self) -> Result<()> {
        let pending = self.failing_calls.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_calls.store(pending - 1, Ordering::SeqCst);
            if self.permanent_failures.load(Ordering::SeqCst) {
                return Err(NetworkFailure {
                    message: "injected rejection".to_string(),
                    status: Some(404),
                    retry_class: RetryClass::Permanent,
                }
                .into());
            }
            return Err(NetworkFailure::retryable("injected network failure").into());
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Resource> ResourceNetworkDataSource<R> for FakeNetwork<R> {
    async fn get_resources(&self, ids: Option<&[String]>) -> Result<Vec<R>> {
        self.check_failure()?;
        let mut state = self.state.lock().expect("network");
        state.payload_requests.push(ids.map(<[String]>::to_vec));
        Ok(match ids {
            None => state.payloads.values().cloned().collect(),
            Some(ids) => ids
                .iter()
                .filter_map(|id| state.payloads.get(id).cloned())
                .collect(),
        })
    }

    async fn get_change_list(&self, after: Option<i64>) -> Result<Vec<ChangeListEntry>> {
        self.check_failure()?;
        let mut state = self.state.lock().expect("network");
        state.change_list_requests.push(after);
        Ok(state
            .change_list
            .iter()
            .filter(|entry| after.map_or(true, |after| entry.change_list_version > after))
            .cloned()
            .collect())
    }
}
