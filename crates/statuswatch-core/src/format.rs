//! Markdown rendering for notifications.
//!
//! Rendering is pure: the [`ReportFormatter`] turns incidents, change-sets and
//! the daily digest into a [`Notification`] that a channel delivers as-is.

use std::fmt::Write as _;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::channels::Notification;
use crate::model::Incident;
use crate::reconciler::{ChangeKind, ChangeSet};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Configuration for report rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Name of the monitored service, used in titles.
    pub service_name: String,
    /// Public status page linked from every report footer.
    pub status_page_url: String,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            service_name: "Cloudflare".to_string(),
            status_page_url: "https://www.cloudflarestatus.com/".to_string(),
        }
    }
}

/// Renders incident reports as Markdown.
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    config: FormatterConfig,
}

impl ReportFormatter {
    /// Creates a formatter with the given configuration.
    #[must_use]
    pub const fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Renders a single incident section.
    #[must_use]
    pub fn render_incident(&self, incident: &Incident) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "### Incident: {}", incident.name);
        let _ = writeln!(out, "- ID: {}", incident.id);
        let _ = writeln!(out, "- Status: {}", incident.status);
        let _ = writeln!(out, "- Impact: {}", incident.impact);
        let _ = writeln!(out, "- Created: {}", timestamp(incident.created_at));
        let _ = writeln!(out, "- Updated: {}", timestamp(incident.updated_at));

        if let Some(at) = incident.monitoring_at {
            let _ = writeln!(out, "- Monitoring since: {}", timestamp(at));
        }
        if let Some(at) = incident.resolved_at {
            let _ = writeln!(out, "- Resolved: {}", timestamp(at));
        }

        if !incident.updates.is_empty() {
            out.push_str("\nUpdate history:\n");
            for update in &incident.updates {
                let _ = writeln!(
                    out,
                    "- {} [{}]: {}",
                    timestamp(update.created_at),
                    update.status,
                    update.body
                );
            }
        }

        if let Some(link) = incident.link() {
            let _ = writeln!(out, "\nIncident link: {link}");
        }

        out.push('\n');
        out
    }

    /// Renders a change-set produced by a reconciliation pass.
    #[must_use]
    pub fn render_change_set(&self, change_set: &ChangeSet, now: DateTime<Utc>) -> Notification {
        match change_set {
            ChangeSet::Initialization(incidents) => self.render_initialization(incidents, now),
            ChangeSet::Delta(changes) => {
                let title = format!("{} Status Update", self.config.service_name);
                let mut body = self.header(&title, "Time", now);

                let sections: Vec<String> = changes
                    .iter()
                    .map(|change| {
                        let heading = match change.kind {
                            ChangeKind::New => "New Incident",
                            ChangeKind::Updated => "Incident Update",
                        };
                        format!("## {heading}\n{}", self.render_incident(&change.incident))
                    })
                    .collect();
                body.push_str(&sections.join("\n"));
                body.push('\n');
                self.footer(&mut body);

                Notification::new(title, body)
            }
        }
    }

    /// Renders the daily digest of incidents created within `window` of
    /// `now`.
    ///
    /// `incidents` is rendered in the order given; incidents outside the
    /// window are skipped.
    #[must_use]
    pub fn render_digest(
        &self,
        incidents: &[Incident],
        now: DateTime<Utc>,
        window: TimeDelta,
    ) -> Notification {
        let title = format!("{} Daily Status Report", self.config.service_name);
        let mut body = self.header(&title, "Report time", now);

        let mut count = 0;
        for incident in incidents.iter().filter(|i| i.is_active_within(now, window)) {
            body.push_str(&self.render_incident(incident));
            count += 1;
        }

        if count == 0 {
            let _ = writeln!(body, "No incidents in the past {}.", describe_window(window));
        }

        self.footer(&mut body);
        Notification::new(title, body)
    }

    fn render_initialization(&self, incidents: &[Incident], now: DateTime<Utc>) -> Notification {
        let title = format!("{} Status Monitor Started", self.config.service_name);
        let mut body = self.header(&title, "Initialized", now);

        if incidents.is_empty() {
            body.push_str("There are no active incidents.\n");
        } else {
            body.push_str("## Current Incidents\n\n");
            for incident in incidents {
                body.push_str(&self.render_incident(incident));
            }
        }

        self.footer(&mut body);
        Notification::new(title, body)
    }

    fn header(&self, title: &str, label: &str, now: DateTime<Utc>) -> String {
        format!("# {title}\n\n{label}: {}\n\n", timestamp(now))
    }

    fn footer(&self, body: &mut String) {
        let _ = write!(
            body,
            "\n---\nFull status: {}",
            self.config.status_page_url
        );
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Describes a window in whole days when possible, otherwise in hours.
fn describe_window(window: TimeDelta) -> String {
    let hours = window.num_hours();
    match (hours / 24, hours % 24) {
        (1, 0) => "day".to_string(),
        (days, 0) => format!("{days} days"),
        _ if hours == 1 => "hour".to_string(),
        _ => format!("{hours} hours"),
    }
}
