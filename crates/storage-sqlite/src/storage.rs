use std::sync::Arc;

use log::info;

use kickfeed_core::Result;

use crate::db::{self, DbPool, InvalidationTracker, WriteHandle, WriterThread};
use crate::{NewsRepository, SqlitePreferencesBackend, TransferRepository};

/// Everything backed by one database file, wired to a single writer.
pub struct SqliteStorage {
    pub pool: Arc<DbPool>,
    pub writer: WriteHandle,
    pub invalidation: Arc<InvalidationTracker>,
    pub news: Arc<NewsRepository>,
    pub transfers: Arc<TransferRepository>,
    pub preferences: Arc<SqlitePreferencesBackend>,
    _writer_thread: WriterThread,
}

impl SqliteStorage {
    /// Creates or upgrades the database under `app_data_dir`.
    pub fn open(app_data_dir: &str) -> Result<Self> {
        let db_path = db::init(app_data_dir)?;
        db::run_migrations(&db_path)?;
        let pool = db::create_pool(&db_path)?;
        let (writer, writer_thread) = db::write_actor::spawn_writer(pool.as_ref().clone());
        let invalidation = Arc::new(InvalidationTracker::new());
        info!("[Storage] Opened {}", db_path);

        Ok(Self {
            news: Arc::new(NewsRepository::new(
                pool.clone(),
                writer.clone(),
                invalidation.clone(),
            )),
            transfers: Arc::new(TransferRepository::new(
                pool.clone(),
                writer.clone(),
                invalidation.clone(),
            )),
            preferences: Arc::new(SqlitePreferencesBackend::new(pool.clone(), writer.clone())),
            pool,
            writer,
            invalidation,
            _writer_thread: writer_thread,
        })
    }
}
