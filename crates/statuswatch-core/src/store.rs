//! In-memory snapshot of the last-known incidents.
//!
//! This module provides the [`SnapshotStore`], which holds the incidents seen
//! on previous poll cycles keyed by identifier. The store is empty at process
//! start, adopted wholesale on the first successful fetch and then updated in
//! place. It is never persisted.
//!
//! Writers (upserts and retention) take an exclusive lock; full-snapshot reads
//! for the daily digest take a shared lock. The map itself is never exposed,
//! so the locking discipline cannot be bypassed.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::model::{Incident, sort_newest_first};

/// Incidents plus the flag set when the first baseline is adopted.
#[derive(Debug, Default)]
struct Snapshot {
    incidents: HashMap<String, Incident>,
    initialized: bool,
}

/// Thread-safe store of the last-known incident snapshot.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    inner: RwLock<Snapshot>,
}

impl SnapshotStore {
    /// Creates a new, uninitialized store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts `incidents` as the baseline if the store has never been
    /// populated.
    ///
    /// Returns the adopted incidents when this call initialized the store and
    /// `None` otherwise. The caller caps the list to the retention limit.
    /// An empty list still initializes the store. Entries written before
    /// initialization are kept unless the baseline replaces them by id.
    pub fn initialize_if_empty(&self, incidents: Vec<Incident>) -> Option<Vec<Incident>> {
        let mut guard = self.inner.write();
        if guard.initialized {
            return None;
        }

        guard.incidents.extend(
            incidents
                .iter()
                .map(|incident| (incident.id.clone(), incident.clone())),
        );
        guard.initialized = true;

        debug!(count = incidents.len(), "snapshot initialized");
        Some(incidents)
    }

    /// Inserts or overwrites an incident by identifier.
    ///
    /// Returns the incident previously stored under the same identifier, if
    /// any. Does not initialize the store.
    pub fn upsert(&self, incident: Incident) -> Option<Incident> {
        self.batch(|batch| batch.upsert(incident))
    }

    /// Keeps only the `max_count` incidents with the most recent creation
    /// time. Returns the number of incidents evicted.
    pub fn enforce_retention(&self, max_count: usize) -> usize {
        self.batch(|batch| batch.enforce_retention(max_count))
    }

    /// Runs several write operations under a single exclusive lock.
    ///
    /// Readers never observe a partially applied batch. Only
    /// [`SnapshotStore::initialize_if_empty`] marks the store initialized.
    pub fn batch<R>(&self, f: impl FnOnce(&mut SnapshotBatch<'_>) -> R) -> R {
        let mut guard = self.inner.write();
        f(&mut SnapshotBatch {
            incidents: &mut guard.incidents,
        })
    }

    /// Returns true once a snapshot has been adopted.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.read().initialized
    }

    /// Gets an incident by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Incident> {
        self.inner.read().incidents.get(id).cloned()
    }

    /// Returns the number of stored incidents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().incidents.len()
    }

    /// Returns true if no incidents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every stored incident, newest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Incident> {
        self.collect(|_| true)
    }

    /// Returns the stored incidents created within `window` of `now`,
    /// newest first.
    #[must_use]
    pub fn active_within(&self, now: DateTime<Utc>, window: TimeDelta) -> Vec<Incident> {
        self.collect(|incident| incident.is_active_within(now, window))
    }

    fn collect(&self, filter: impl Fn(&Incident) -> bool) -> Vec<Incident> {
        let mut incidents: Vec<Incident> = self
            .inner
            .read()
            .incidents
            .values()
            .filter(|incident| filter(incident))
            .cloned()
            .collect();
        sort_newest_first(&mut incidents);
        incidents
    }
}

/// Write access to the snapshot while the exclusive lock is held.
#[derive(Debug)]
pub struct SnapshotBatch<'a> {
    incidents: &'a mut HashMap<String, Incident>,
}

impl SnapshotBatch<'_> {
    /// Gets an incident by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Incident> {
        self.incidents.get(id)
    }

    /// Inserts or overwrites an incident, returning the prior entry.
    pub fn upsert(&mut self, incident: Incident) -> Option<Incident> {
        self.incidents.insert(incident.id.clone(), incident)
    }

    /// Returns the number of stored incidents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Returns true if no incidents are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Keeps only the `max_count` newest incidents by creation time.
    ///
    /// Ties on creation time keep the lexicographically smaller identifier.
    /// Returns the number of incidents evicted.
    pub fn enforce_retention(&mut self, max_count: usize) -> usize {
        if self.incidents.len() <= max_count {
            return 0;
        }

        let mut ranked: Vec<&Incident> = self.incidents.values().collect();
        ranked.sort_by(|a, b| Incident::newest_first(a, b));
        let evict: Vec<String> = ranked
            .into_iter()
            .skip(max_count)
            .map(|incident| incident.id.clone())
            .collect();

        for id in &evict {
            self.incidents.remove(id);
            debug!(incident_id = %id, "evicted incident from snapshot");
        }

        evict.len()
    }
}
