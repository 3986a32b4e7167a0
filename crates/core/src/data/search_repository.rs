use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::WatchStream;

use super::{read_or_log, ResourceDao};
use crate::preferences::{PreferencesDataSource, UserData};
use crate::resources::{
    map_to_user_resources, NewsResource, Resource, ResourceKind, TransferResource,
    UserNewsResource, UserTransferResource,
};
use crate::utils::combine_latest;

/// Canonical rows matching a search, both kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub news_resources: Vec<NewsResource>,
    pub transfer_resources: Vec<TransferResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchResult {
    pub news_resources: Vec<UserNewsResource>,
    pub transfer_resources: Vec<UserTransferResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "result", rename_all = "snake_case")]
pub enum SearchResultState {
    /// Blank query; nothing was searched.
    EmptyQuery,
    /// The search index has no rows yet (nothing synced).
    NotReady,
    /// Possibly empty list of matches.
    Success(UserSearchResult),
}

pub struct SearchContentsRepository {
    news: Arc<dyn ResourceDao<NewsResource>>,
    transfers: Arc<dyn ResourceDao<TransferResource>>,
    preferences: Arc<PreferencesDataSource>,
}

impl SearchContentsRepository {
    pub fn new(
        news: Arc<dyn ResourceDao<NewsResource>>,
        transfers: Arc<dyn ResourceDao<TransferResource>>,
        preferences: Arc<PreferencesDataSource>,
    ) -> Self {
        Self {
            news,
            transfers,
            preferences,
        }
    }

    /// Rows whose search text matches `query`, re-emitted on every store write.
    pub fn search_contents(&self, query: &str) -> BoxStream<'static, SearchResult> {
        let query = query.trim().to_string();
        let news = Arc::clone(&self.news);
        let transfers = Arc::clone(&self.transfers);
        self.store_changes()
            .map(move |_| matching_rows(news.as_ref(), transfers.as_ref(), &query))
            .boxed()
    }

    /// Total rows across both search indexes.
    pub fn get_search_contents_count(&self) -> BoxStream<'static, i64> {
        let news = Arc::clone(&self.news);
        let transfers = Arc::clone(&self.transfers);
        self.store_changes()
            .map(move |_| index_size(news.as_ref(), transfers.as_ref()))
            .boxed()
    }

    /// Search joined with the overlay, distinguishing "nothing synced yet"
    /// from "no matches".
    pub fn search(&self, query: &str) -> BoxStream<'static, SearchResultState> {
        let query = query.trim().to_string();
        if query.is_empty() {
            return stream::once(future::ready(SearchResultState::EmptyQuery)).boxed();
        }

        let news = Arc::clone(&self.news);
        let transfers = Arc::clone(&self.transfers);
        combine_latest(self.store_changes(), self.preferences.user_data())
            .map(move |(_, user_data)| {
                if index_size(news.as_ref(), transfers.as_ref()) == 0 {
                    return SearchResultState::NotReady;
                }
                let rows = matching_rows(news.as_ref(), transfers.as_ref(), &query);
                SearchResultState::Success(join(rows, &user_data))
            })
            .boxed()
    }

    fn store_changes(&self) -> BoxStream<'static, (u64, u64)> {
        combine_latest(
            WatchStream::new(self.news.changes()),
            WatchStream::new(self.transfers.changes()),
        )
        .boxed()
    }
}

fn index_size(
    news: &dyn ResourceDao<NewsResource>,
    transfers: &dyn ResourceDao<TransferResource>,
) -> i64 {
    read_or_log(ResourceKind::News, "search count", || news.search_count())
        + read_or_log(ResourceKind::Transfer, "search count", || transfers.search_count())
}

fn matching_rows(
    news: &dyn ResourceDao<NewsResource>,
    transfers: &dyn ResourceDao<TransferResource>,
    query: &str,
) -> SearchResult {
    if query.is_empty() {
        return SearchResult::default();
    }
    SearchResult {
        news_resources: rows_for(news, query),
        transfer_resources: rows_for(transfers, query),
    }
}

fn rows_for<R: Resource>(dao: &dyn ResourceDao<R>, query: &str) -> Vec<R> {
    let ids: BTreeSet<String> = read_or_log(R::KIND, "search", || dao.search_ids(query))
        .into_iter()
        .collect();
    if ids.is_empty() {
        return Vec::new();
    }
    read_or_log(R::KIND, "search rows", || dao.get_resources(Some(&ids)))
}

fn join(rows: SearchResult, user_data: &UserData) -> UserSearchResult {
    UserSearchResult {
        news_resources: map_to_user_resources(rows.news_resources, user_data),
        transfer_resources: map_to_user_resources(rows.transfer_resources, user_data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::InMemoryPreferencesBackend;
    use crate::test_utils::{news, transfer, InMemoryDao};

    struct Fixture {
        news: Arc<InMemoryDao<NewsResource>>,
        transfers: Arc<InMemoryDao<TransferResource>>,
        preferences: Arc<PreferencesDataSource>,
        repo: SearchContentsRepository,
    }

    async fn fixture() -> Fixture {
        let news = Arc::new(InMemoryDao::<NewsResource>::new());
        let transfers = Arc::new(InMemoryDao::<TransferResource>::new());
        let preferences = Arc::new(
            PreferencesDataSource::load(Arc::new(InMemoryPreferencesBackend::new()))
                .await
                .expect("prefs"),
        );
        let repo = SearchContentsRepository::new(
            news.clone(),
            transfers.clone(),
            preferences.clone(),
        );
        Fixture {
            news,
            transfers,
            preferences,
            repo,
        }
    }

    #[tokio::test]
    async fn blank_query_is_distinguished() {
        let f = fixture().await;
        f.news.seed(vec![news("1", 1)]);
        let states: Vec<_> = f.repo.search("   ").collect().await;
        assert_eq!(states, vec![SearchResultState::EmptyQuery]);
    }

    #[tokio::test]
    async fn empty_index_is_not_ready() {
        let f = fixture().await;
        let state = f.repo.search("derby").next().await.expect("state");
        assert_eq!(state, SearchResultState::NotReady);
    }

    #[tokio::test]
    async fn matches_span_both_kinds_and_carry_the_overlay() {
        let f = fixture().await;
        let mut headline = news("1", 1);
        headline.title = "Derby day preview".to_string();
        f.news.seed(vec![headline, news("2", 2)]);
        let mut signing = transfer("7");
        signing.club_to = "Derby County".to_string();
        f.transfers.seed(vec![signing, transfer("8")]);
        f.preferences
            .set_bookmarked(ResourceKind::Transfer, "7", true)
            .await;

        let state = f.repo.search("derby").next().await.expect("state");
        let SearchResultState::Success(result) = state else {
            panic!("expected matches, got {state:?}");
        };
        assert_eq!(result.news_resources.len(), 1);
        assert_eq!(result.news_resources[0].id(), "1");
        assert_eq!(result.transfer_resources.len(), 1);
        assert!(result.transfer_resources[0].is_saved);
    }

    #[tokio::test]
    async fn no_matches_is_success_not_pending() {
        let f = fixture().await;
        f.news.seed(vec![news("1", 1)]);
        let state = f.repo.search("zzz").next().await.expect("state");
        assert_eq!(state, SearchResultState::Success(UserSearchResult::default()));
    }

    #[tokio::test]
    async fn contents_and_count_follow_writes() {
        let f = fixture().await;
        let mut count = f.repo.get_search_contents_count();
        assert_eq!(count.next().await, Some(0));

        f.news.seed(vec![news("1", 1)]);
        assert_eq!(count.next().await, Some(1));
        f.transfers.seed(vec![transfer("3")]);
        assert_eq!(count.next().await, Some(2));

        let contents = f
            .repo
            .search_contents("Player")
            .next()
            .await
            .expect("contents");
        assert!(contents.news_resources.is_empty());
        assert_eq!(contents.transfer_resources.len(), 1);
    }
}
