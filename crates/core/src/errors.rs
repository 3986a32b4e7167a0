//! Error taxonomy shared by every kickfeed crate.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Retry policy class for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    Permanent,
}

/// A remote-source failure, already flattened by the network crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NetworkFailure {
    pub message: String,
    pub status: Option<u16>,
    pub retry_class: RetryClass,
}

impl NetworkFailure {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            retry_class: RetryClass::Retryable,
        }
    }
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Failures of the durable preferences blob.
///
/// `Corrupted` is kept apart from `Io` so callers can tell a damaged blob from
/// a store that simply could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferencesError {
    #[error("Preferences are corrupted: {0}")]
    Corrupted(String),

    #[error("Preferences I/O failed: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(#[from] NetworkFailure),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Preferences(#[from] PreferencesError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Sync error: {0}")]
    Sync(String),
}

impl Error {
    /// Whether a later attempt may get past this failure.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Network(failure) => failure.retry_class,
            Self::Database(_) | Self::Sync(_) => RetryClass::Retryable,
            Self::Preferences(PreferencesError::Io(_)) => RetryClass::Retryable,
            Self::Preferences(PreferencesError::Corrupted(_)) | Self::Serde(_) => {
                RetryClass::Permanent
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corruption_is_permanent() {
        let err = Error::from(PreferencesError::Corrupted("bad json".to_string()));
        assert_eq!(err.retry_class(), RetryClass::Permanent);
        assert!(err.to_string().contains("corrupted"));
    }

    #[test]
    fn permanent_network_failure_is_not_retried() {
        let err = Error::from(NetworkFailure {
            message: "HTTP 404".to_string(),
            status: Some(404),
            retry_class: RetryClass::Permanent,
        });
        assert_eq!(err.retry_class(), RetryClass::Permanent);
        assert_eq!(
            Error::from(NetworkFailure::retryable("timeout")).retry_class(),
            RetryClass::Retryable
        );
    }
}
