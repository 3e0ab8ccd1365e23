//! Core types for incident tracking.
//!
//! This module provides the data carried through a poll cycle:
//! - [`Incident`]: One upstream-reported disruption with its update log
//! - [`IncidentUpdate`]: A single entry in an incident's update log
//! - [`IncidentsResponse`]: The envelope returned by the status page API
//!
//! Incidents are immutable once decoded. The only derived behaviour is the
//! pair of predicates the reconciler relies on: [`Incident::is_active_within`]
//! and [`Incident::changed_since`].

use std::cmp::Ordering;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A single entry in an incident's update log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentUpdate {
    /// Upstream identifier of the update.
    pub id: String,
    /// Status label at the time of the update.
    pub status: String,
    /// Free-form update text.
    #[serde(default)]
    pub body: String,
    /// When the update was created.
    pub created_at: DateTime<Utc>,
    /// When the update was last edited.
    pub updated_at: DateTime<Utc>,
}

impl IncidentUpdate {
    /// Creates a new update posted at `at`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        status: impl Into<String>,
        body: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            status: status.into(),
            body: body.into(),
            created_at: at,
            updated_at: at,
        }
    }
}

/// An incident reported by the status page.
///
/// `status` and `impact` are free-form strings enumerated by the upstream
/// and are not validated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Upstream identifier, unique per status page.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current status (e.g. `investigating`, `resolved`).
    pub status: String,
    /// When the incident was opened.
    pub created_at: DateTime<Utc>,
    /// When the incident was last touched upstream.
    pub updated_at: DateTime<Utc>,
    /// When the incident entered monitoring, if it has.
    #[serde(default)]
    pub monitoring_at: Option<DateTime<Utc>>,
    /// When the incident was resolved, if it has been.
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Impact classification (e.g. `minor`, `major`).
    #[serde(default)]
    pub impact: String,
    /// Link to the incident page.
    #[serde(default)]
    pub shortlink: Option<String>,
    /// Update log in upstream order.
    #[serde(default, rename = "incident_updates")]
    pub updates: Vec<IncidentUpdate>,
}

impl Incident {
    /// Creates a new incident opened at `created_at` with no updates.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: "investigating".to_string(),
            created_at,
            updated_at: created_at,
            monitoring_at: None,
            resolved_at: None,
            impact: "none".to_string(),
            shortlink: None,
            updates: Vec::new(),
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Sets the impact classification.
    #[must_use]
    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = impact.into();
        self
    }

    /// Sets the last-update timestamp.
    #[must_use]
    pub const fn updated(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }

    /// Sets the monitoring-start timestamp.
    #[must_use]
    pub const fn monitoring_since(mut self, at: DateTime<Utc>) -> Self {
        self.monitoring_at = Some(at);
        self
    }

    /// Sets the resolved timestamp.
    #[must_use]
    pub const fn resolved(mut self, at: DateTime<Utc>) -> Self {
        self.resolved_at = Some(at);
        self
    }

    /// Sets the external link.
    #[must_use]
    pub fn with_shortlink(mut self, link: impl Into<String>) -> Self {
        self.shortlink = Some(link.into());
        self
    }

    /// Appends an update to the log.
    #[must_use]
    pub fn with_update(mut self, update: IncidentUpdate) -> Self {
        self.updates.push(update);
        self
    }

    /// Returns the external link, ignoring an empty string.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.shortlink.as_deref().filter(|l| !l.is_empty())
    }

    /// Returns true if the incident was created strictly after
    /// `reference - window`.
    ///
    /// A window reaching past the representable calendar range covers every
    /// incident.
    #[must_use]
    pub fn is_active_within(&self, reference: DateTime<Utc>, window: TimeDelta) -> bool {
        reference
            .checked_sub_signed(window)
            .is_none_or(|start| self.created_at > start)
    }

    /// Returns true if `updated_at` differs from `other.updated_at`.
    ///
    /// This is the only change signal: a differing status with an unchanged
    /// timestamp does not count.
    #[must_use]
    pub fn changed_since(&self, other: &Self) -> bool {
        self.updated_at != other.updated_at
    }

    /// Orders incidents newest-first by creation time, then by identifier.
    #[must_use]
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Sorts incidents newest-first by creation time.
///
/// Ties are broken by identifier so the order is deterministic.
pub fn sort_newest_first(incidents: &mut [Incident]) {
    incidents.sort_by(Incident::newest_first);
}

/// The envelope returned by a Statuspage `incidents.json` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentsResponse {
    /// The incidents in upstream order.
    #[serde(default)]
    pub incidents: Vec<Incident>,
}
