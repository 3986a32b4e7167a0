//! Offline-first repository joining stored resources with the user overlay.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use log::warn;
use tokio_stream::wrappers::WatchStream;

use super::ResourceDao;
use crate::errors::Result;
use crate::preferences::{PreferencesDataSource, UserData};
use crate::resources::{
    map_to_user_resources, NewsResource, Resource, ResourceKind, TransferResource,
    UserResource,
};
use crate::sync::{
    change_list_sync, ResourceNetworkDataSource, SyncStatus, Syncable, Synchronizer,
};

/// Filter for [`OfflineFirstResourceRepository::get_resources`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    /// Only these ids; `None` means every stored row.
    pub filter_ids: Option<BTreeSet<String>>,
}

impl ResourceQuery {
    pub fn ids<I: IntoIterator<Item = impl Into<String>>>(ids: I) -> Self {
        Self {
            filter_ids: Some(ids.into_iter().map(Into::into).collect()),
        }
    }
}

/// Reads are live joins: every stream re-emits when either the kind's tables
/// or the overlay change. Nothing here writes resources outside of
/// [`Syncable::sync_with`], and overlay writes go through
/// [`super::UserDataRepository`].
pub struct OfflineFirstResourceRepository<R: Resource> {
    dao: Arc<dyn ResourceDao<R>>,
    network: Arc<dyn ResourceNetworkDataSource<R>>,
    preferences: Arc<PreferencesDataSource>,
}

pub type OfflineFirstNewsRepository = OfflineFirstResourceRepository<NewsResource>;
pub type OfflineFirstTransferRepository = OfflineFirstResourceRepository<TransferResource>;

impl<R: Resource> OfflineFirstResourceRepository<R> {
    pub fn new(
        dao: Arc<dyn ResourceDao<R>>,
        network: Arc<dyn ResourceNetworkDataSource<R>>,
        preferences: Arc<PreferencesDataSource>,
    ) -> Self {
        Self {
            dao,
            network,
            preferences,
        }
    }

    pub fn get_resources(&self, query: ResourceQuery) -> BoxStream<'static, Vec<UserResource<R>>> {
        self.observe(move |dao, user_data| {
            let rows = read_or_log(R::KIND, "resources", || {
                dao.get_resources(query.filter_ids.as_ref())
            });
            map_to_user_resources(rows, user_data)
        })
    }

    pub fn get_resource(&self, id: &str) -> BoxStream<'static, Option<UserResource<R>>> {
        let id = id.to_string();
        self.observe(move |dao, user_data| {
            read_or_log(R::KIND, "resource", || dao.get_resource(&id))
                .map(|resource| UserResource::new(resource, user_data))
        })
    }

    pub fn get_resources_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> BoxStream<'static, Vec<UserResource<R>>> {
        self.observe(move |dao, user_data| {
            let rows = read_or_log(R::KIND, "page", || dao.get_resources_page(limit, offset));
            map_to_user_resources(rows, user_data)
        })
    }

    /// Row count; re-emits only when the kind's tables change.
    pub fn get_count(&self) -> BoxStream<'static, i64> {
        let dao = Arc::clone(&self.dao);
        WatchStream::new(self.dao.changes())
            .map(move |_| read_or_log(R::KIND, "count", || dao.count()))
            .boxed()
    }

    fn observe<T, F>(&self, query: F) -> BoxStream<'static, T>
    where
        T: Send + 'static,
        F: Fn(&dyn ResourceDao<R>, &UserData) -> T + Send + 'static,
    {
        let dao = Arc::clone(&self.dao);
        crate::utils::combine_latest(
            WatchStream::new(self.dao.changes()),
            self.preferences.user_data(),
        )
        .map(move |(_, user_data)| query(dao.as_ref(), &user_data))
        .boxed()
    }
}

#[async_trait]
impl<R: Resource> Syncable for OfflineFirstResourceRepository<R> {
    fn kind(&self) -> ResourceKind {
        R::KIND
    }

    async fn sync_status(&self, synchronizer: &dyn Synchronizer) -> SyncStatus {
        change_list_sync::<R, _, _>(synchronizer, self.network.as_ref(), self.dao.as_ref()).await
    }
}

/// Read paths never fail outward: errors are logged and read as empty.
pub(crate) fn read_or_log<T: Default>(
    kind: ResourceKind,
    what: &str,
    read: impl FnOnce() -> Result<T>,
) -> T {
    read().unwrap_or_else(|err| {
        warn!("[Repository] Failed to read {} {}: {}", kind, what, err);
        T::default()
    })
}
