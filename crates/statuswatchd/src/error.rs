//! Error types for statuswatchd.

use statuswatch_core::MonitorError;
use thiserror::Error;

/// Errors that can occur while starting the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction failed.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Monitor error.
    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

/// Result type for daemon operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = DaemonError::Config("DINGTALK_SECRET cannot be empty".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: DINGTALK_SECRET cannot be empty"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DaemonError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }

    #[test]
    fn test_monitor_error_is_transparent() {
        let err: DaemonError = MonitorError::config("max_incidents must be greater than 0").into();
        assert_eq!(
            err.to_string(),
            "invalid configuration: max_incidents must be greater than 0"
        );
    }
}
