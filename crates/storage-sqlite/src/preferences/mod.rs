mod backend;

pub use backend::SqlitePreferencesBackend;
