//! Preferences blob persisted as a single row.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;

use kickfeed_core::errors::PreferencesError;
use kickfeed_core::preferences::PreferencesBackend;
use kickfeed_core::Result;

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::user_preferences;

const PREFERENCES_ROW_ID: i32 = 1;

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = user_preferences)]
struct UserPreferencesRowDB {
    id: i32,
    payload: String,
    updated_at: String,
}

pub struct SqlitePreferencesBackend {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SqlitePreferencesBackend {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    fn load_impl(&self) -> Result<Option<String>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(user_preferences::table
            .find(PREFERENCES_ROW_ID)
            .select(user_preferences::payload)
            .first::<String>(&mut conn)
            .optional()
            .map_err(StorageError::from)?)
    }
}

#[async_trait]
impl PreferencesBackend for SqlitePreferencesBackend {
    async fn load(&self) -> std::result::Result<Option<String>, PreferencesError> {
        self.load_impl()
            .map_err(|err| PreferencesError::Io(err.to_string()))
    }

    async fn store(&self, blob: String) -> std::result::Result<(), PreferencesError> {
        let row = UserPreferencesRowDB {
            id: PREFERENCES_ROW_ID,
            payload: blob,
            updated_at: Utc::now().to_rfc3339(),
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(user_preferences::table)
                    .values(&row)
                    .on_conflict(user_preferences::id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
            .map_err(|err| PreferencesError::Io(err.to_string()))
    }
}
