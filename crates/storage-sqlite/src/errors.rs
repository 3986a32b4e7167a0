//! Storage errors and their mapping into the core taxonomy.

use kickfeed_core::errors::{DatabaseError, Error};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Database file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Writer is not running")]
    WriterClosed,
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        Error::Database(match err {
            StorageError::Connection(_) | StorageError::Pool(_) | StorageError::Io(_) => {
                DatabaseError::ConnectionFailed(message)
            }
            StorageError::Query(_) => DatabaseError::QueryFailed(message),
            StorageError::Migration(_) | StorageError::WriterClosed => {
                DatabaseError::Internal(message)
            }
        })
    }
}
