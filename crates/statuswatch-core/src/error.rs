//! Error types for the statuswatch-core crate.

use thiserror::Error;

/// Errors that can occur while monitoring a status page.
///
/// Reconciliation and formatting never fail; every variant here belongs to
/// configuration or to one of the external collaborators.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Startup configuration is invalid.
    #[error("invalid configuration: {reason}")]
    ConfigInvalid {
        /// The reason the configuration was rejected.
        reason: String,
    },

    /// Fetching incidents from the status page failed.
    #[error("fetch failed: {reason}")]
    FetchFailed {
        /// The reason the fetch failed.
        reason: String,
    },

    /// The status page returned a payload that could not be decoded.
    #[error("decode failed: {reason}")]
    DecodeFailed {
        /// The reason decoding failed.
        reason: String,
    },

    /// Notification delivery failed.
    #[error("notification failed: {reason}")]
    NotificationFailed {
        /// The reason the notification failed.
        reason: String,
    },
}

impl MonitorError {
    /// Creates a `ConfigInvalid` error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            reason: reason.into(),
        }
    }

    /// Returns true if the error only affects the current poll cycle.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::ConfigInvalid { .. })
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::DecodeFailed {
            reason: err.to_string(),
        }
    }
}

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
