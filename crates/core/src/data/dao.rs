use std::collections::BTreeSet;

use tokio::sync::watch;

use crate::errors::Result;
use crate::resources::Resource;
use crate::sync::ResourceWriter;

/// Read side of the relational store for one resource kind, plus its
/// full-text shadow table.
pub trait ResourceDao<R: Resource>: ResourceWriter<R> {
    fn get_resource(&self, id: &str) -> Result<Option<R>>;

    /// Every row, or only rows whose id is in `filter_ids`, in the kind's
    /// recency order.
    fn get_resources(&self, filter_ids: Option<&BTreeSet<String>>) -> Result<Vec<R>>;

    fn get_resources_page(&self, limit: i64, offset: i64) -> Result<Vec<R>>;

    fn count(&self) -> Result<i64>;

    /// Ids whose shadow row matches `query`.
    fn search_ids(&self, query: &str) -> Result<Vec<String>>;

    fn search_count(&self) -> Result<i64>;

    /// Bumped after every committed write to this kind's tables.
    fn changes(&self) -> watch::Receiver<u64>;
}
