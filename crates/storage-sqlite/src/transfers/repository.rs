use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel::SqliteConnection;
use tokio::sync::watch;

use kickfeed_core::data::ResourceDao;
use kickfeed_core::resources::{ResourceKind, TransferResource};
use kickfeed_core::sync::{AppliedChanges, ChangeBatch, ResourceWriter};
use kickfeed_core::Result;

use super::model::TransferResourceDB;
use crate::db::{get_connection, DbPool, InvalidationTracker, WriteHandle};
use crate::errors::StorageError;
use crate::fts::TRANSFER_FTS;
use crate::schema::transfer_resources;
use crate::schema::transfer_resources::dsl::*;

/// Transfers have no timestamp; newer transfers carry larger numeric ids.
pub struct TransferRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    invalidation: Arc<InvalidationTracker>,
}

impl TransferRepository {
    pub fn new(
        pool: Arc<DbPool>,
        writer: WriteHandle,
        invalidation: Arc<InvalidationTracker>,
    ) -> Self {
        TransferRepository {
            pool,
            writer,
            invalidation,
        }
    }

    fn load(
        &self,
        filter_ids: Option<&BTreeSet<String>>,
        page: Option<(i64, i64)>,
    ) -> Result<Vec<TransferResource>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = transfer_resources
            .select(TransferResourceDB::as_select())
            .order(sql::<BigInt>("CAST(id AS INTEGER)").desc())
            .into_boxed();
        if let Some(ids) = filter_ids {
            query = query.filter(id.eq_any(ids.iter().cloned().collect::<Vec<_>>()));
        }
        if let Some((limit, offset)) = page {
            query = query.limit(limit.max(0)).offset(offset.max(0));
        }
        let rows = query
            .load::<TransferResourceDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(TransferResource::from).collect())
    }
}

/// Replaces the shadow row of an already upserted resource row.
fn write_shadow_row(conn: &mut SqliteConnection, row: &TransferResourceDB) -> Result<()> {
    let docid = TRANSFER_FTS
        .docid(conn, &row.id)?
        .ok_or(StorageError::Query(diesel::result::Error::NotFound))?;
    TRANSFER_FTS.delete_docid(conn, docid)?;
    diesel::sql_query(
        "INSERT INTO transferResourcesFts \
         (docid, transfer_resource_id, player_name, club_from, club_to) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind::<BigInt, _>(docid)
    .bind::<Text, _>(&row.id)
    .bind::<Text, _>(&row.player_name)
    .bind::<Text, _>(&row.club_from)
    .bind::<Text, _>(&row.club_to)
    .execute(conn)
    .map_err(StorageError::from)?;
    Ok(())
}

#[async_trait]
impl ResourceWriter<TransferResource> for TransferRepository {
    async fn apply_changes(&self, batch: ChangeBatch<TransferResource>) -> Result<AppliedChanges> {
        let applied = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<AppliedChanges> {
                let mut applied = AppliedChanges::default();
                for deleted_id in &batch.deleted_ids {
                    TRANSFER_FTS.delete(conn, deleted_id)?;
                    applied.deleted += diesel::delete(transfer_resources.find(deleted_id))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                for resource in batch.upserts {
                    let row = TransferResourceDB::from(resource);
                    diesel::insert_into(transfer_resources::table)
                        .values(&row)
                        .on_conflict(transfer_resources::id)
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
        self.invalidation.invalidate(ResourceKind::Transfer);
        Ok(applied)
    }
}

impl ResourceDao<TransferResource> for TransferRepository {
    fn get_resource(&self, resource_id: &str) -> Result<Option<TransferResource>> {
        let mut conn = get_connection(&self.pool)?;
        let row = transfer_resources
            .find(resource_id)
            .select(TransferResourceDB::as_select())
            .first::<TransferResourceDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(TransferResource::from))
    }

    fn get_resources(
        &self,
        filter_ids: Option<&BTreeSet<String>>,
    ) -> Result<Vec<TransferResource>> {
        match filter_ids {
            Some(ids) if ids.is_empty() => Ok(Vec::new()),
            _ => self.load(filter_ids, None),
        }
    }

    fn get_resources_page(&self, limit: i64, offset: i64) -> Result<Vec<TransferResource>> {
        self.load(None, Some((limit, offset)))
    }

    fn count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        Ok(transfer_resources
            .count()
            .get_result(&mut conn)
            .map_err(StorageError::from)?)
    }

    fn search_ids(&self, query: &str) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(TRANSFER_FTS.search_ids(&mut conn, query)?)
    }

    fn search_count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        Ok(TRANSFER_FTS.count(&mut conn)?)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.invalidation.subscribe(ResourceKind::Transfer)
    }
}
