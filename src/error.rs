//! Error types returned when completing a task

use std::error::Error;

use thiserror::Error;

use crate::item::ItemId;

/// The error type that persistence collaborators (see [`TaskStore`](crate::traits::TaskStore)) return
pub type StoreError = Box<dyn Error + Send + Sync>;

/// Everything that can prevent a completion from happening.
///
/// Callers should treat any of these as "the completion did not happen".
/// The only exception is a [`CompletionError::Write`] on the historical copy of a recurring task:
/// in this case the live resource has already been advanced (this is logged as an error).
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Missing {key} in {component}")]
    MissingProperty { component: String, key: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRecurrence(String),

    #[error("Unable to fetch {id}: {source}")]
    Fetch {
        id: ItemId,
        #[source]
        source: StoreError,
    },

    #[error("Unable to write {id}: {source}")]
    Write {
        id: ItemId,
        #[source]
        source: StoreError,
    },
}

impl CompletionError {
    pub(crate) fn missing<C: ToString, K: ToString>(component: C, key: K) -> Self {
        Self::MissingProperty {
            component: component.to_string(),
            key: key.to_string(),
        }
    }
}

/// Errors of the HTTP store ([`Client`](crate::client::Client))
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Authentication failed (HTTP {0}). Use an app password, not your regular password")]
    AuthFailed(u16),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Cannot reach the CalDAV server (HTTP {0})")]
    ServerUnavailable(u16),

    #[error("Unexpected HTTP status code {0}")]
    UnexpectedStatus(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl RemoteError {
    /// Classify a non-successful HTTP status
    pub fn from_status(status: u16, target: &str) -> Self {
        match status {
            401 => Self::AuthFailed(status),
            404 => Self::NotFound(target.to_string()),
            429 => Self::RateLimited,
            0 | 500 | 502 | 503 | 504 => Self::ServerUnavailable(status),
            other => Self::UnexpectedStatus(other),
        }
    }
}

/// Errors when loading [`Settings`](crate::config::Settings)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown time zone {0}")]
    UnknownTimezone(String),

    #[error("No server configured")]
    NoServer,

    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(RemoteError::from_status(401, "x"), RemoteError::AuthFailed(401)));
        assert!(matches!(RemoteError::from_status(403, "x"), RemoteError::UnexpectedStatus(403)));
        assert!(matches!(RemoteError::from_status(404, "x"), RemoteError::NotFound(_)));
        assert!(matches!(RemoteError::from_status(429, "x"), RemoteError::RateLimited));
        assert!(matches!(RemoteError::from_status(500, "x"), RemoteError::ServerUnavailable(500)));
        assert!(matches!(RemoteError::from_status(502, "x"), RemoteError::ServerUnavailable(502)));
        assert!(matches!(RemoteError::from_status(504, "x"), RemoteError::ServerUnavailable(504)));
        assert!(matches!(RemoteError::from_status(501, "x"), RemoteError::UnexpectedStatus(501)));
    }

    #[test]
    fn test_missing_property_message() {
        let err = CompletionError::missing("VTODO", "DTSTART");
        assert_eq!(err.to_string(), "Missing DTSTART in VTODO");
    }
}
