//! statuswatchd - status page incident notifier
//!
//! Polls the configured status page and posts incident changes and a daily
//! digest to DingTalk until interrupted.

use clap::Parser;
use statuswatchd::{DaemonConfig, build_monitor};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "statuswatchd")]
#[command(about = "Status page incident notifier")]
#[command(version)]
struct Cli {
    /// Path to config file (`.toml`, or KEY=VALUE lines)
    #[arg(short, long, env = "STATUSWATCH_CONFIG", default_value = "env.config")]
    config: PathBuf,

    /// Log notifications instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("statuswatchd=info,statuswatch_core=info"));
    let (plain, json) = if cli.log_json {
        (None, Some(fmt::layer().json()))
    } else {
        (Some(fmt::layer()), None)
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .init();

    info!(config = %cli.config.display(), "starting statuswatchd");

    let config = DaemonConfig::from_file(&cli.config)?;
    config.validate(!cli.dry_run)?;
    info!(
        source = %config.source.status_api_url,
        interval_minutes = config.monitor.poll_interval_minutes,
        report_hour_utc = config.monitor.daily_report_hour_utc,
        max_incidents = config.monitor.max_incidents,
        "loaded config"
    );

    let mut monitor = build_monitor(&config, cli.dry_run)?;

    if cli.once {
        let outcome = monitor.tick(chrono::Utc::now()).await;
        if let Some(e) = outcome.fetch_error {
            warn!(error = %e, "poll cycle failed");
            return Err(e.into());
        }
        info!(fetched = outcome.fetched, "poll cycle complete");
        return Ok(());
    }

    let ticks = monitor.run(shutdown_signal()).await;
    info!(ticks, "statuswatchd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
}
