//! Daemon configuration.
//!
//! Configuration is read from a single file, in one of two formats:
//! - `*.toml` files with `[monitor]`, `[source]`, `[dingtalk]` and `[report]` tables
//! - anything else as `KEY=VALUE` lines (the `env.config` format), where
//!   blank lines, `#` comments and unknown keys are ignored

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use statuswatch_core::{FormatterConfig, MonitorConfig};

use crate::error::{DaemonError, Result};

/// Default Statuspage incidents endpoint.
pub const DEFAULT_STATUS_API_URL: &str = "https://www.cloudflarestatus.com/api/v2/incidents.json";

/// Default DingTalk robot endpoint.
pub const DEFAULT_DINGTALK_URL: &str = "https://oapi.dingtalk.com/robot/send";

/// Configuration for the incident source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    /// Statuspage `incidents.json` URL.
    pub status_api_url: String,
    /// Timeout in seconds for HTTP requests.
    pub http_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            status_api_url: DEFAULT_STATUS_API_URL.to_string(),
            http_timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    /// Returns the HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Configuration for the DingTalk robot channel.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DingTalkConfig {
    /// Robot endpoint.
    pub webhook_url: String,
    /// Robot access token.
    pub access_token: String,
    /// Signing secret.
    pub secret: String,
}

impl Default for DingTalkConfig {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_DINGTALK_URL.to_string(),
            access_token: String::new(),
            secret: String::new(),
        }
    }
}

// Keeps credentials out of logs.
impl std::fmt::Debug for DingTalkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DingTalkConfig")
            .field("webhook_url", &self.webhook_url)
            .field("access_token", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Main daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Poll, report and retention settings.
    pub monitor: MonitorConfig,
    /// Incident source settings.
    #[serde(default)]
    pub source: SourceConfig,
    /// DingTalk channel settings.
    #[serde(default)]
    pub dingtalk: DingTalkConfig,
    /// Report rendering settings.
    #[serde(default)]
    pub report: FormatterConfig,
}

impl DaemonConfig {
    /// Load configuration from a file.
    ///
    /// Files ending in `.toml` are parsed as TOML, anything else as
    /// `KEY=VALUE` lines. The result is not validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DaemonError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml(&content)
        } else {
            Self::from_key_values(&content)
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DaemonError::Config(format!("invalid TOML: {e}")))
    }

    /// Parse configuration from `KEY=VALUE` lines.
    ///
    /// Missing numeric keys fall back to zero, which validation rejects for
    /// the interval and the retention cap.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric key has a non-numeric value.
    pub fn from_key_values(content: &str) -> Result<Self> {
        let mut config = Self {
            monitor: MonitorConfig {
                poll_interval_minutes: 0,
                daily_report_hour_utc: 0,
                max_incidents: 0,
                ..MonitorConfig::default()
            },
            source: SourceConfig::default(),
            dingtalk: DingTalkConfig::default(),
            report: FormatterConfig::default(),
        };

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "CHECK_INTERVAL_MINUTES" => {
                    config.monitor.poll_interval_minutes = parse_number(key, value)?;
                }
                "DAILY_REPORT_UTC_HOUR" => {
                    config.monitor.daily_report_hour_utc = parse_number(key, value)?;
                }
                "MAX_INCIDENTS" => config.monitor.max_incidents = parse_number(key, value)?,
                "ACTIVE_WINDOW_HOURS" => {
                    config.monitor.active_window_hours = parse_number(key, value)?;
                }
                "HTTP_TIMEOUT_SECS" => config.source.http_timeout_secs = parse_number(key, value)?,
                "STATUS_API_URL" => config.source.status_api_url = value.to_string(),
                "STATUS_PAGE_URL" => config.report.status_page_url = value.to_string(),
                "SERVICE_NAME" => config.report.service_name = value.to_string(),
                "DINGTALK_WEBHOOK_URL" => config.dingtalk.webhook_url = value.to_string(),
                "DINGTALK_WEBHOOK_TOKEN" => config.dingtalk.access_token = value.to_string(),
                "DINGTALK_SECRET" => config.dingtalk.secret = value.to_string(),
                _ => {}
            }
        }

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// DingTalk credentials are only checked when `require_credentials` is
    /// set, so dry runs work without them.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self, require_credentials: bool) -> Result<()> {
        self.monitor.validate()?;

        if self.source.status_api_url.is_empty() {
            return Err(DaemonError::Config(
                "status_api_url cannot be empty".to_string(),
            ));
        }

        if self.source.http_timeout_secs == 0 {
            return Err(DaemonError::Config(
                "http_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if require_credentials {
            if self.dingtalk.access_token.is_empty() {
                return Err(DaemonError::Config(
                    "DingTalk access token cannot be empty".to_string(),
                ));
            }
            if self.dingtalk.secret.is_empty() {
                return Err(DaemonError::Config(
                    "DingTalk secret cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        DaemonError::Config(format!(
            "{} must be a non-negative integer, got '{value}'",
            key.trim()
        ))
    })
}
