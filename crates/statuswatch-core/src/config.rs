//! Monitor configuration.
//!
//! Validated once at startup; an invalid configuration is fatal.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};

/// Configuration for the poll loop, daily report and retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Minutes between poll ticks.
    pub poll_interval_minutes: u64,
    /// UTC hour (0-23) at which the daily report is sent.
    pub daily_report_hour_utc: u32,
    /// Maximum number of incidents kept in the snapshot.
    pub max_incidents: usize,
    /// Trailing window, in hours, within which incidents are tracked.
    #[serde(default = "default_active_window_hours")]
    pub active_window_hours: u32,
}

/// Longest accepted poll interval: one day.
pub const MAX_POLL_INTERVAL_MINUTES: u64 = 24 * 60;

/// Longest accepted active window: one hundred years.
pub const MAX_ACTIVE_WINDOW_HOURS: u32 = 24 * 365 * 100;

const fn default_active_window_hours() -> u32 {
    72
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_minutes: 5,
            daily_report_hour_utc: 0,
            max_incidents: 50,
            active_window_hours: default_active_window_hours(),
        }
    }
}

impl MonitorConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::ConfigInvalid` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_minutes == 0 {
            return Err(MonitorError::config(
                "poll_interval_minutes must be greater than 0",
            ));
        }

        if self.poll_interval_minutes > MAX_POLL_INTERVAL_MINUTES {
            return Err(MonitorError::config(format!(
                "poll_interval_minutes must be at most {MAX_POLL_INTERVAL_MINUTES}, got {}",
                self.poll_interval_minutes
            )));
        }

        if self.daily_report_hour_utc > 23 {
            return Err(MonitorError::config(format!(
                "daily_report_hour_utc must be between 0 and 23, got {}",
                self.daily_report_hour_utc
            )));
        }

        if self.max_incidents == 0 {
            return Err(MonitorError::config("max_incidents must be greater than 0"));
        }

        if self.active_window_hours == 0 {
            return Err(MonitorError::config(
                "active_window_hours must be greater than 0",
            ));
        }

        if self.active_window_hours > MAX_ACTIVE_WINDOW_HOURS {
            return Err(MonitorError::config(format!(
                "active_window_hours must be at most {MAX_ACTIVE_WINDOW_HOURS}, got {}",
                self.active_window_hours
            )));
        }

        Ok(())
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes.saturating_mul(60))
    }

    /// Returns the active window.
    #[must_use]
    pub fn active_window(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.active_window_hours))
    }
}
