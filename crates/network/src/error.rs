use kickfeed_core::errors::{NetworkFailure, RetryClass};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetworkError>;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

impl NetworkError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Transport failures and server-side trouble are worth another attempt;
    /// a payload we cannot read will not get better on its own.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Http(err) => match err.status() {
                Some(status) => retry_class_for_status(status.as_u16()),
                None => RetryClass::Retryable,
            },
            Self::Api { status, .. } => retry_class_for_status(*status),
            Self::Json(_) | Self::Malformed(_) => RetryClass::Permanent,
        }
    }
}

fn retry_class_for_status(status: u16) -> RetryClass {
    match status {
        408 | 409 | 423 | 425 | 429 => RetryClass::Retryable,
        500..=599 => RetryClass::Retryable,
        _ => RetryClass::Permanent,
    }
}

impl From<NetworkError> for NetworkFailure {
    fn from(err: NetworkError) -> Self {
        NetworkFailure {
            status: err.status_code(),
            retry_class: err.retry_class(),
            message: err.to_string(),
        }
    }
}

impl From<NetworkError> for kickfeed_core::Error {
    fn from(err: NetworkError) -> Self {
        kickfeed_core::Error::Network(err.into())
    }
}
