//! Incident reconciliation.
//!
//! The [`Reconciler`] ingests the incident list fetched on each poll cycle,
//! diffs it against the [`SnapshotStore`], applies the delta and returns a
//! [`ChangeSet`] describing what the notification should contain.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::model::Incident;
use crate::store::SnapshotStore;

/// How an incident entered a delta change-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// The identifier was not in the snapshot.
    New,
    /// The identifier was present with a different `updated_at`.
    Updated,
}

impl ChangeKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Updated => "updated",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified incident in a delta change-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Why the incident is reported.
    pub kind: ChangeKind,
    /// The incident as fetched.
    pub incident: Incident,
}

/// The outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "incidents", rename_all = "lowercase")]
pub enum ChangeSet {
    /// The store was empty and adopted these incidents as its baseline.
    Initialization(Vec<Incident>),
    /// Incidents that are new or updated since the previous pass, in fetch
    /// order.
    Delta(Vec<Change>),
}

impl ChangeSet {
    /// Returns true for an initialization change-set.
    #[must_use]
    pub const fn is_initialization(&self) -> bool {
        matches!(self, Self::Initialization(_))
    }

    /// Returns the number of incidents carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Initialization(incidents) => incidents.len(),
            Self::Delta(changes) => changes.len(),
        }
    }

    /// Returns true if no incidents are carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if this change-set warrants a notification.
    ///
    /// Initialization is always reported, even when empty.
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        self.is_initialization() || !self.is_empty()
    }

    /// Returns the number of entries of the given kind.
    #[must_use]
    pub fn count(&self, kind: ChangeKind) -> usize {
        match self {
            Self::Initialization(_) => 0,
            Self::Delta(changes) => changes.iter().filter(|c| c.kind == kind).count(),
        }
    }
}

/// Limits applied on every reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Retention cap for the snapshot, also the truncation length for
    /// fetched lists.
    pub max_incidents: usize,
    /// Trailing window within which incidents are eligible for change
    /// detection.
    pub active_window: TimeDelta,
}

impl From<&MonitorConfig> for ReconcilePolicy {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            max_incidents: config.max_incidents,
            active_window: config.active_window(),
        }
    }
}

/// Diffs fetched incident lists against the snapshot store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<SnapshotStore>,
    policy: ReconcilePolicy,
}

impl Reconciler {
    /// Creates a reconciler over `store`.
    #[must_use]
    pub const fn new(store: Arc<SnapshotStore>, policy: ReconcilePolicy) -> Self {
        Self { store, policy }
    }

    /// Returns the shared snapshot store.
    #[must_use]
    pub const fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Returns the active policy.
    #[must_use]
    pub const fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    /// Reconciles a fetched incident list against the snapshot.
    ///
    /// `fetched` must already be sorted newest-first by creation time; only
    /// its first `max_incidents` entries are considered. The first call on an
    /// empty store adopts the list wholesale and returns
    /// [`ChangeSet::Initialization`]. Later calls upsert every candidate
    /// created within the active window of `now`, leave older incidents
    /// untouched, enforce the retention cap and return the delta.
    pub fn reconcile(&self, mut fetched: Vec<Incident>, now: DateTime<Utc>) -> ChangeSet {
        let max = self.policy.max_incidents;
        if fetched.len() > max {
            debug!(
                fetched = fetched.len(),
                max_incidents = max,
                "truncating fetched incidents to retention cap"
            );
            fetched.truncate(max);
        }

        if let Some(baseline) = self.store.initialize_if_empty(fetched.clone()) {
            info!(count = baseline.len(), "snapshot initialized from first fetch");
            return ChangeSet::Initialization(baseline);
        }

        let window = self.policy.active_window;
        let (changes, evicted) = self.store.batch(|batch| {
            let mut changes = Vec::new();

            for incident in fetched {
                if !incident.is_active_within(now, window) {
                    debug!(
                        incident_id = %incident.id,
                        created_at = %incident.created_at,
                        "skipping incident outside active window"
                    );
                    continue;
                }

                let kind = match batch.get(&incident.id) {
                    None => {
                        info!(incident_id = %incident.id, name = %incident.name, "new incident");
                        Some(ChangeKind::New)
                    }
                    Some(prior) if incident.changed_since(prior) => {
                        info!(
                            incident_id = %incident.id,
                            name = %incident.name,
                            status = %incident.status,
                            "incident updated"
                        );
                        if prior.status != incident.status {
                            info!(
                                incident_id = %incident.id,
                                from = %prior.status,
                                to = %incident.status,
                                "incident status changed"
                            );
                        }
                        Some(ChangeKind::Updated)
                    }
                    Some(prior) => {
                        if prior.status != incident.status {
                            debug!(
                                incident_id = %incident.id,
                                from = %prior.status,
                                to = %incident.status,
                                "status differs without timestamp bump, not reported"
                            );
                        } else {
                            debug!(incident_id = %incident.id, "incident unchanged");
                        }
                        None
                    }
                };

                if let Some(kind) = kind {
                    changes.push(Change {
                        kind,
                        incident: incident.clone(),
                    });
                }
                batch.upsert(incident);
            }

            (changes, batch.enforce_retention(max))
        });

        debug!(
            changes = changes.len(),
            evicted,
            stored = self.store.len(),
            "reconciliation complete"
        );

        ChangeSet::Delta(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn minutes(n: i64) -> DateTime<Utc> {
        t0() + TimeDelta::minutes(n)
    }

    fn incident(id: &str, created: i64, updated: i64) -> Incident {
        Incident::new(id, format!("Incident {id}"), minutes(created)).updated(minutes(updated))
    }

    fn reconciler(max_incidents: usize) -> Reconciler {
        Reconciler::new(
            Arc::new(SnapshotStore::new()),
            ReconcilePolicy {
                max_incidents,
                active_window: TimeDelta::days(3),
            },
        )
    }

    fn delta(set: ChangeSet) -> Vec<(String, ChangeKind)> {
        match set {
            ChangeSet::Delta(changes) => changes
                .into_iter()
                .map(|c| (c.incident.id, c.kind))
                .collect(),
            ChangeSet::Initialization(_) => panic!("expected delta change-set"),
        }
    }

    mod initialization_tests {
        use super::*;

        #[test]
        fn first_pass_initializes() {
            let r = reconciler(5);
            let set = r.reconcile(vec![incident("a", 0, 0)], minutes(10));

            assert!(set.is_initialization());
            assert_eq!(set.len(), 1);
            assert!(r.store().get("a").is_some());
        }

        #[test]
        fn empty_initialization_is_reportable() {
            let r = reconciler(5);
            let set = r.reconcile(Vec::new(), minutes(10));

            assert_eq!(set, ChangeSet::Initialization(Vec::new()));
            assert!(set.is_reportable());
        }

        #[test]
        fn initializes_exactly_once() {
            let r = reconciler(5);
            assert!(r.reconcile(Vec::new(), minutes(0)).is_initialization());
            for _ in 0..3 {
                let set = r.reconcile(Vec::new(), minutes(1));
                assert_eq!(set, ChangeSet::Delta(Vec::new()));
            }
        }

        #[test]
        fn prior_writes_do_not_suppress_initialization() {
            let r = reconciler(5);
            r.store().upsert(incident("a", 0, 0));

            let set = r.reconcile(vec![incident("b", 1, 1)], minutes(10));
            assert_eq!(set, ChangeSet::Initialization(vec![incident("b", 1, 1)]));
        }

        #[test]
        fn initialization_respects_truncation() {
            let r = reconciler(2);
            let fetched = vec![incident("c", 3, 3), incident("b", 2, 2), incident("a", 1, 1)];
            let set = r.reconcile(fetched, minutes(10));

            assert_eq!(set.len(), 2);
            assert_eq!(r.store().len(), 2);
            assert!(r.store().get("a").is_none());
        }
    }

    mod delta_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn end_to_end_scenario() {
            let r = reconciler(5);

            let first = r.reconcile(vec![incident("A", 0, 0)], minutes(5));
            assert_eq!(first, ChangeSet::Initialization(vec![incident("A", 0, 0)]));

            let second = r.reconcile(
                vec![incident("B", 1, 1), incident("A", 0, 60)],
                minutes(90),
            );
            let mut got = delta(second);
            got.sort_by(|a, b| a.0.cmp(&b.0));
            assert_eq!(
                got,
                vec![
                    ("A".to_string(), ChangeKind::Updated),
                    ("B".to_string(), ChangeKind::New),
                ]
            );
            assert_eq!(r.store().get("A").map(|a| a.updated_at), Some(minutes(60)));

            let third = r.reconcile(
                vec![incident("B", 1, 1), incident("A", 0, 60)],
                minutes(120),
            );
            assert!(third.is_empty());
            assert!(!third.is_reportable());
        }

        #[test_case("investigating", "investigating", 1, true ; "timestamp bump is an update")]
        #[test_case("investigating", "resolved", 0, false ; "status change alone is ignored")]
        #[test_case("investigating", "resolved", 1, true ; "status change with bump is an update")]
        fn change_detection(old_status: &str, new_status: &str, bump: i64, expect: bool) {
            let r = reconciler(5);
            r.reconcile(vec![incident("a", 0, 0).with_status(old_status)], minutes(1));

            let set = r.reconcile(
                vec![incident("a", 0, bump).with_status(new_status)],
                minutes(2),
            );
            assert_eq!(set.count(ChangeKind::Updated) == 1, expect);
        }

        #[test]
        fn unchanged_incident_is_still_refreshed() {
            let r = reconciler(5);
            r.reconcile(vec![incident("a", 0, 0)], minutes(1));

            let set = r.reconcile(
                vec![incident("a", 0, 0).with_impact("major")],
                minutes(2),
            );
            assert!(set.is_empty());
            assert_eq!(r.store().get("a").map(|a| a.impact), Some("major".to_string()));
        }

        #[test]
        fn repeated_batch_is_idempotent() {
            let r = reconciler(5);
            r.reconcile(Vec::new(), minutes(0));

            let batch = vec![incident("b", 2, 2), incident("a", 1, 1)];
            assert_eq!(r.reconcile(batch.clone(), minutes(3)).len(), 2);
            assert!(r.reconcile(batch, minutes(4)).is_empty());
        }

        #[test]
        fn shorter_fetch_does_not_evict() {
            let r = reconciler(5);
            r.reconcile(vec![incident("b", 2, 2), incident("a", 1, 1)], minutes(3));

            r.reconcile(vec![incident("b", 2, 2)], minutes(4));
            assert_eq!(r.store().len(), 2);
        }

        #[test]
        fn preserves_fetch_order() {
            let r = reconciler(5);
            r.reconcile(Vec::new(), minutes(0));

            let set = r.reconcile(
                vec![incident("c", 3, 3), incident("b", 2, 2), incident("a", 1, 1)],
                minutes(4),
            );
            let ids: Vec<_> = delta(set).into_iter().map(|(id, _)| id).collect();
            assert_eq!(ids, vec!["c", "b", "a"]);
        }
    }

    mod window_tests {
        use super::*;

        #[test]
        fn stale_incident_is_not_inserted() {
            let r = reconciler(5);
            r.reconcile(Vec::new(), minutes(0));

            let now = minutes(0) + TimeDelta::days(4);
            let set = r.reconcile(vec![incident("old", 0, 0)], now);

            assert!(set.is_empty());
            assert!(r.store().get("old").is_none());
        }

        #[test]
        fn stale_incident_is_not_refreshed() {
            let r = reconciler(5);
            r.reconcile(vec![incident("a", 0, 0)], minutes(1));

            let now = minutes(0) + TimeDelta::days(4);
            let set = r.reconcile(vec![incident("a", 0, 30).with_status("resolved")], now);

            assert!(set.is_empty());
            let stored = r.store().get("a").unwrap();
            assert_eq!(stored.updated_at, minutes(0));
            assert_eq!(stored.status, "investigating");
        }

        #[test]
        fn oversized_window_does_not_panic() {
            let r = Reconciler::new(
                Arc::new(SnapshotStore::new()),
                ReconcilePolicy {
                    max_incidents: 5,
                    active_window: TimeDelta::hours(4_000_000_000),
                },
            );
            r.reconcile(vec![incident("a", 0, 0)], minutes(1));

            let set = r.reconcile(vec![incident("a", 0, 5)], minutes(10));
            assert_eq!(set.count(ChangeKind::Updated), 1);
        }
    }

    mod retention_tests {
        use super::*;

        #[test]
        fn only_prefix_is_diffed() {
            let r = reconciler(2);
            r.reconcile(Vec::new(), minutes(0));

            let set = r.reconcile(
                vec![incident("c", 3, 3), incident("b", 2, 2), incident("a", 1, 1)],
                minutes(4),
            );
            let ids: Vec<_> = delta(set).into_iter().map(|(id, _)| id).collect();
            assert_eq!(ids, vec!["c", "b"]);
            assert!(r.store().get("a").is_none());
        }

        #[test]
        fn store_never_exceeds_cap() {
            let r = reconciler(3);
            r.reconcile(Vec::new(), minutes(0));

            for round in 0..10 {
                let batch = vec![
                    incident(&format!("x{round}"), round * 2 + 1, round * 2 + 1),
                    incident(&format!("y{round}"), round * 2, round * 2),
                ];
                r.reconcile(batch, minutes(30));
                assert!(r.store().len() <= 3);
            }

            let ids: Vec<_> = r.store().snapshot().into_iter().map(|i| i.id).collect();
            assert_eq!(ids, vec!["x9", "y9", "x8"]);
        }
    }
}
