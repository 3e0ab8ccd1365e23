//! Poll-cycle driver and daily report gate.
//!
//! A [`Monitor`] wires an [`IncidentSource`], the [`Reconciler`], the
//! [`ReportFormatter`] and a set of [`NotificationChannel`]s together behind a
//! single [`Monitor::tick`] entry point. Ticks run one at a time; the daily
//! report check piggybacks on every tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::channels::{Notification, NotificationChannel};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::format::ReportFormatter;
use crate::reconciler::{ChangeSet, ReconcilePolicy, Reconciler};
use crate::source::IncidentSource;
use crate::store::SnapshotStore;

/// Decides when the daily report is due.
///
/// The report is due when the current UTC hour equals the configured hour and
/// no report has been recorded yet on the current UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyReportGate {
    hour_utc: u32,
    last_sent: Option<DateTime<Utc>>,
}

impl DailyReportGate {
    /// Creates a gate for the given UTC hour with no report recorded.
    #[must_use]
    pub const fn new(hour_utc: u32) -> Self {
        Self {
            hour_utc,
            last_sent: None,
        }
    }

    /// Returns the configured UTC hour.
    #[must_use]
    pub const fn hour_utc(&self) -> u32 {
        self.hour_utc
    }

    /// Returns when the last report was recorded.
    #[must_use]
    pub const fn last_sent(&self) -> Option<DateTime<Utc>> {
        self.last_sent
    }

    /// Returns true if the report should be sent at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now.hour() == self.hour_utc
            && self
                .last_sent
                .is_none_or(|last| last.date_naive() != now.date_naive())
    }

    /// Records a successful send at `at`.
    pub fn record_sent(&mut self, at: DateTime<Utc>) {
        self.last_sent = Some(at);
    }
}

/// Outcome of delivering one notification to every channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Channels that accepted the notification.
    pub sent: usize,
    /// Channels that failed.
    pub failed: usize,
}

impl Delivery {
    /// Returns true if at least one channel accepted the notification or
    /// none failed.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        self.sent > 0 || self.failed == 0
    }
}

/// What happened during one tick.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Number of incidents returned by the source.
    pub fetched: usize,
    /// The fetch error, if the fetch failed.
    pub fetch_error: Option<MonitorError>,
    /// The change-set produced by reconciliation, if the fetch succeeded.
    pub change_set: Option<ChangeSet>,
    /// Delivery of the change-set notification, if one was sent.
    pub notification: Option<Delivery>,
    /// Delivery of the daily report, if one was due.
    pub daily_report: Option<Delivery>,
}

/// Drives fetch, reconciliation and notification on each tick.
#[derive(Debug)]
pub struct Monitor {
    reconciler: Reconciler,
    formatter: ReportFormatter,
    gate: DailyReportGate,
    poll_interval: Duration,
    source: Box<dyn IncidentSource>,
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl Monitor {
    /// Creates a monitor with an empty snapshot and no channels.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::ConfigInvalid` if `config` does not validate.
    pub fn new(
        config: &MonitorConfig,
        formatter: ReportFormatter,
        source: Box<dyn IncidentSource>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            reconciler: Reconciler::new(
                Arc::new(SnapshotStore::new()),
                ReconcilePolicy::from(config),
            ),
            formatter,
            gate: DailyReportGate::new(config.daily_report_hour_utc),
            poll_interval: config.poll_interval(),
            source,
            channels: Vec::new(),
        })
    }

    /// Adds a notification channel.
    pub fn add_channel(&mut self, channel: Box<dyn NotificationChannel>) {
        info!(channel = %channel.name(), "added notification channel");
        self.channels.push(channel);
    }

    /// Adds a notification channel, builder style.
    #[must_use]
    pub fn with_channel(mut self, channel: Box<dyn NotificationChannel>) -> Self {
        self.add_channel(channel);
        self
    }

    /// Returns the number of channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns the shared snapshot store.
    #[must_use]
    pub const fn store(&self) -> &Arc<SnapshotStore> {
        self.reconciler.store()
    }

    /// Returns the daily report gate.
    #[must_use]
    pub const fn gate(&self) -> &DailyReportGate {
        &self.gate
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Runs one poll cycle at `now`.
    ///
    /// Fetch and delivery failures are logged and recorded in the outcome;
    /// they never abort the tick.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        match self.source.fetch().await {
            Ok(incidents) => {
                outcome.fetched = incidents.len();
                debug!(source = %self.source.name(), count = incidents.len(), "fetched incidents");

                let change_set = self.reconciler.reconcile(incidents, now);
                if change_set.is_reportable() {
                    let notification = self.formatter.render_change_set(&change_set, now);
                    outcome.notification = Some(self.deliver(&notification).await);
                } else {
                    debug!("no changes, skipping notification");
                }
                outcome.change_set = Some(change_set);
            }
            Err(e) => {
                warn!(source = %self.source.name(), error = %e, "failed to fetch incidents");
                outcome.fetch_error = Some(e);
            }
        }

        if self.gate.is_due(now) {
            let delivery = self.send_daily_report(now).await;
            if delivery.is_delivered() {
                self.gate.record_sent(now);
                info!(sent = delivery.sent, "daily report sent");
            } else {
                warn!(failed = delivery.failed, "daily report failed, will retry next tick");
            }
            outcome.daily_report = Some(delivery);
        }

        outcome
    }

    /// Renders and delivers the digest of incidents in the active window.
    ///
    /// Does not touch the daily report gate.
    pub async fn send_daily_report(&self, now: DateTime<Utc>) -> Delivery {
        let window = self.reconciler.policy().active_window;
        let incidents = self.store().active_within(now, window);
        info!(count = incidents.len(), "rendering daily report");

        let notification = self.formatter.render_digest(&incidents, now, window);
        self.deliver(&notification).await
    }

    /// Ticks immediately, then once per poll interval until `shutdown`
    /// resolves. Returns the number of ticks run.
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> usize {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut ticks = 0;
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(ticks, "shutdown requested, stopping poll loop");
                    break;
                }
                _ = interval.tick() => {
                    let outcome = self.tick(Utc::now()).await;
                    ticks += 1;
                    debug!(
                        tick = ticks,
                        fetched = outcome.fetched,
                        changes = outcome.change_set.as_ref().map_or(0, ChangeSet::len),
                        "tick complete"
                    );
                }
            }
        }

        ticks
    }

    async fn deliver(&self, notification: &Notification) -> Delivery {
        let mut delivery = Delivery::default();

        for channel in self.channels.iter().filter(|c| c.is_enabled()) {
            match channel.send(notification).await {
                Ok(result) if result.accepted => {
                    info!(channel = %result.channel, title = %notification.title, "notification sent");
                    delivery.sent += 1;
                }
                Ok(result) => {
                    warn!(channel = %result.channel, detail = ?result.detail, "notification failed");
                    delivery.failed += 1;
                }
                Err(e) => {
                    warn!(channel = %channel.name(), error = %e, "notification error");
                    delivery.failed += 1;
                }
            }
        }

        delivery
    }
}
