//! Status page incident tracking and change notification.
//!
//! `statuswatch-core` polls an incident feed, reconciles each fetched list
//! against an in-memory snapshot and renders Markdown reports describing what
//! changed. Network access lives behind two traits, so the core itself never
//! performs I/O.
//!
//! # Features
//!
//! - **Snapshot Store**: Lock-guarded map of last-known incidents with a retention cap
//! - **Reconciler**: Classifies fetched incidents as new or updated by `updated_at`
//! - **Active Window**: Only incidents created in the trailing window are diffed
//! - **Daily Digest**: A once-per-UTC-day summary at a configured hour
//! - **Notification Channels**: Pluggable transports behind [`NotificationChannel`]
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use chrono::{TimeDelta, TimeZone, Utc};
//! use statuswatch_core::{ChangeSet, Incident, ReconcilePolicy, Reconciler, SnapshotStore};
//!
//! let reconciler = Reconciler::new(
//!     Arc::new(SnapshotStore::new()),
//!     ReconcilePolicy {
//!         max_incidents: 50,
//!         active_window: TimeDelta::days(3),
//!     },
//! );
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
//! let outage = Incident::new("p7x1", "Elevated 5xx errors", t0);
//!
//! // The first pass adopts the fetched list as the baseline.
//! let first = reconciler.reconcile(vec![outage.clone()], t0);
//! assert!(first.is_initialization());
//!
//! // A bumped `updated_at` is reported as an update.
//! let bumped = outage.updated(t0 + TimeDelta::minutes(30));
//! let second = reconciler.reconcile(vec![bumped], t0 + TimeDelta::hours(1));
//! assert!(matches!(second, ChangeSet::Delta(ref changes) if changes.len() == 1));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channels;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod reconciler;
pub mod scheduler;
pub mod source;
pub mod store;

// Re-export main types at crate root
pub use channels::{LogChannel, Notification, NotificationChannel, NotificationResult};
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use format::{FormatterConfig, ReportFormatter};
pub use model::{Incident, IncidentUpdate, IncidentsResponse, sort_newest_first};
pub use reconciler::{Change, ChangeKind, ChangeSet, ReconcilePolicy, Reconciler};
pub use scheduler::{DailyReportGate, Delivery, Monitor, TickOutcome};
pub use source::IncidentSource;
pub use store::{SnapshotBatch, SnapshotStore};
