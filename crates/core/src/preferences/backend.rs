//! Durable storage seam for the preferences blob.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::errors::PreferencesError;

/// Stores the serialized preferences blob.
///
/// `load` returns `Ok(None)` when nothing was ever written (first run).
#[async_trait]
pub trait PreferencesBackend: Send + Sync {
    async fn load(&self) -> Result<Option<String>, PreferencesError>;
    async fn store(&self, blob: String) -> Result<(), PreferencesError>;
}

/// Process-local backend for hosts without durable storage.
#[derive(Debug, Default)]
pub struct InMemoryPreferencesBackend {
    blob: Mutex<Option<String>>,
}

impl InMemoryPreferencesBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    pub fn blob(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl PreferencesBackend for InMemoryPreferencesBackend {
    async fn load(&self) -> Result<Option<String>, PreferencesError> {
        self.blob
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| PreferencesError::Io("preferences lock poisoned".to_string()))
    }

    async fn store(&self, blob: String) -> Result<(), PreferencesError> {
        let mut guard = self
            .blob
            .lock()
            .map_err(|_| PreferencesError::Io("preferences lock poisoned".to_string()))?;
        *guard = Some(blob);
        Ok(())
    }
}
