//! SQLite persistence for the kickfeed mirror: resource tables, their FTS4
//! shadow tables and the preferences blob.

pub mod db;
pub mod errors;
mod fts;
pub mod news;
pub mod preferences;
pub mod schema;
mod storage;
pub mod transfers;

pub use errors::StorageError;
pub use fts::sanitize_match_query;
pub use news::NewsRepository;
pub use preferences::SqlitePreferencesBackend;
pub use storage::SqliteStorage;
pub use transfers::TransferRepository;
