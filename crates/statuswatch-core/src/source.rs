//! Incident sources.

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Incident;

/// Trait for upstream incident feeds.
///
/// Implementations own retrieval, decoding and timeouts, and must return
/// incidents sorted newest-first by creation time.
#[async_trait]
pub trait IncidentSource: Send + Sync + fmt::Debug {
    /// Returns the name of this source.
    fn name(&self) -> &str;

    /// Fetches the current incident list.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::FetchFailed` if the upstream is unreachable and
    /// `MonitorError::DecodeFailed` if its payload is malformed.
    async fn fetch(&self) -> Result<Vec<Incident>>;
}
