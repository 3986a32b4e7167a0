use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel::SqliteConnection;
use tokio::sync::watch;

use kickfeed_core::data::ResourceDao;
use kickfeed_core::resources::{NewsResource, ResourceKind};
use kickfeed_core::sync::{AppliedChanges, ChangeBatch, ResourceWriter};
use kickfeed_core::Result;

use super::model::NewsResourceDB;
use crate::db::{get_connection, DbPool, InvalidationTracker, WriteHandle};
use crate::errors::StorageError;
use crate::fts::NEWS_FTS;
use crate::schema::news_resources;
use crate::schema::news_resources::dsl::*;

pub struct NewsRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    invalidation: Arc<InvalidationTracker>,
}

impl NewsRepository {
    pub fn new(
        pool: Arc<DbPool>,
        writer: WriteHandle,
        invalidation: Arc<InvalidationTracker>,
    ) -> Self {
        NewsRepository {
            pool,
            writer,
            invalidation,
        }
    }

    fn load(
        &self,
        filter_ids: Option<&BTreeSet<String>>,
        page: Option<(i64, i64)>,
    ) -> Result<Vec<NewsResource>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = news_resources
            .select(NewsResourceDB::as_select())
            .order((publish_date.desc(), id.desc()))
            .into_boxed();
        if let Some(ids) = filter_ids {
            query = query.filter(id.eq_any(ids.iter().cloned().collect::<Vec<_>>()));
        }
        if let Some((limit, offset)) = page {
            query = query.limit(limit.max(0)).offset(offset.max(0));
        }
        let rows = query
            .load::<NewsResourceDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(NewsResource::from).collect())
    }
}

/// Replaces the shadow row of an already upserted resource row.
fn write_shadow_row(conn: &mut SqliteConnection, row: &NewsResourceDB) -> Result<()> {
    let docid = NEWS_FTS
        .docid(conn, &row.id)?
        .ok_or(StorageError::Query(diesel::result::Error::NotFound))?;
    NEWS_FTS.delete_docid(conn, docid)?;
    diesel::sql_query(
        "INSERT INTO newsResourcesFts (docid, news_resource_id, title, content) \
         VALUES (?, ?, ?, ?)",
    )
    .bind::<BigInt, _>(docid)
    .bind::<Text, _>(&row.id)
    .bind::<Text, _>(&row.title)
    .bind::<Text, _>(&row.content)
    .execute(conn)
    .map_err(StorageError::from)?;
    Ok(())
}

#[async_trait]
impl ResourceWriter<NewsResource> for NewsRepository {
    async fn apply_changes(&self, batch: ChangeBatch<NewsResource>) -> Result<AppliedChanges> {
        let applied = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<AppliedChanges> {
                let mut applied = AppliedChanges::default();
                for deleted_id in &batch.deleted_ids {
                    NEWS_FTS.delete(conn, deleted_id)?;
                    applied.deleted += diesel::delete(news_resources.find(deleted_id))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                for resource in batch.upserts {
                    let row = NewsResourceDB::from(resource);
                    diesel::insert_into(news_resources::table)
                        .values(&row)
                        .on_conflict(news_resources::id)
                        .do_update()
                        .set(&row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    write_shadow_row(conn, &row)?;
                    applied.upserted += 1;
                }
                Ok(applied)
            })
            .await?;
        self.invalidation.invalidate(ResourceKind::News);
        Ok(applied)
    }
}

impl ResourceDao<NewsResource> for NewsRepository {
    fn get_resource(&self, resource_id: &str) -> Result<Option<NewsResource>> {
        let mut conn = get_connection(&self.pool)?;
        let row = news_resources
            .find(resource_id)
            .select(NewsResourceDB::as_select())
            .first::<NewsResourceDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(NewsResource::from))
    }

    fn get_resources(&self, filter_ids: Option<&BTreeSet<String>>) -> Result<Vec<NewsResource>> {
        match filter_ids {
            Some(ids) if ids.is_empty() => Ok(Vec::new()),
            _ => self.load(filter_ids, None),
        }
    }

    fn get_resources_page(&self, limit: i64, offset: i64) -> Result<Vec<NewsResource>> {
        self.load(None, Some((limit, offset)))
    }

    fn count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        Ok(news_resources
            .count()
            .get_result(&mut conn)
            .map_err(StorageError::from)?)
    }

    fn search_ids(&self, query: &str) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(NEWS_FTS.search_ids(&mut conn, query)?)
    }

    fn search_count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        Ok(NEWS_FTS.count(&mut conn)?)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.invalidation.subscribe(ResourceKind::News)
    }
}
