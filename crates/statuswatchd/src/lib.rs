//! statuswatchd - status page incident notifier
//!
//! Polls a Statuspage incident feed and pushes new incidents, incident
//! updates and a daily digest to a DingTalk robot.
//!
//! The daemon wires the network collaborators into
//! [`statuswatch_core::Monitor`]:
//! - [`statuspage::StatuspageSource`] fetches `incidents.json`
//! - [`dingtalk::DingTalkChannel`] posts signed Markdown messages
//!
//! With `dry_run` set, reports go to the log instead of DingTalk.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dingtalk;
pub mod error;
pub mod statuspage;

use statuswatch_core::{LogChannel, Monitor, ReportFormatter};
use tracing::info;

pub use config::DaemonConfig;
pub use dingtalk::DingTalkChannel;
pub use error::{DaemonError, Result};
pub use statuspage::StatuspageSource;

/// Builds a monitor from a validated configuration.
///
/// # Errors
///
/// Returns an error if the monitor settings are invalid or an HTTP client
/// cannot be built.
pub fn build_monitor(config: &DaemonConfig, dry_run: bool) -> Result<Monitor> {
    let source = StatuspageSource::new(&config.source)?;
    info!(url = %source.url(), "using status page source");

    let monitor = Monitor::new(
        &config.monitor,
        ReportFormatter::new(config.report.clone()),
        Box::new(source),
    )?;

    let monitor = if dry_run {
        info!("dry run, notifications will be logged only");
        monitor.with_channel(Box::new(LogChannel::new("dry-run")))
    } else {
        let channel = DingTalkChannel::new(config.dingtalk.clone(), config.source.http_timeout())?;
        monitor.with_channel(Box::new(channel))
    };

    Ok(monitor)
}
