//! Notification channels for report delivery.
//!
//! This module provides the [`NotificationChannel`] trait that transports
//! implement, plus a [`LogChannel`] that writes reports to the log instead
//! of sending them anywhere.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// A rendered report ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Short title, used by transports that show one.
    pub title: String,
    /// Markdown body.
    pub body: String,
}

impl Notification {
    /// Creates a new notification.
    #[must_use]
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// What a channel reported back for one notification.
///
/// A rejected notification is not an error: the transport answered, but
/// refused or could not confirm delivery.
#[derive(Debug, Clone)]
pub struct NotificationResult {
    /// True if the transport accepted the notification.
    pub accepted: bool,
    /// Name of the channel that handled it.
    pub channel: String,
    /// Transport reply or rejection reason.
    pub detail: Option<String>,
    /// HTTP status of the transport reply, for HTTP channels.
    pub http_status: Option<u16>,
}

impl NotificationResult {
    /// An accepted notification.
    #[must_use]
    pub fn accepted(channel: impl Into<String>) -> Self {
        Self {
            accepted: true,
            channel: channel.into(),
            detail: None,
            http_status: None,
        }
    }

    /// A rejected notification with the reason given by the transport.
    #[must_use]
    pub fn rejected(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            channel: channel.into(),
            detail: Some(reason.into()),
            http_status: None,
        }
    }

    /// Attaches the HTTP status of the reply.
    #[must_use]
    pub const fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Attaches a reply detail.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Trait for notification channels.
///
/// Implementations own their transport, authentication and timeouts.
#[async_trait]
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    /// Returns the name of this channel.
    fn name(&self) -> &str;

    /// Sends a notification through this channel.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::NotificationFailed` if the notification cannot
    /// be sent.
    async fn send(&self, notification: &Notification) -> Result<NotificationResult>;

    /// Returns true if this channel is enabled.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// A channel that logs notifications instead of delivering them.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
    enabled: bool,
}

impl LogChannel {
    /// Creates a new log channel.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    /// Sets whether the channel is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new("log")
    }
}

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<NotificationResult> {
        if !self.is_enabled() {
            return Ok(NotificationResult::accepted(self.name()).with_detail("channel disabled"));
        }

        info!(
            channel = %self.name,
            title = %notification.title,
            bytes = notification.body.len(),
            "notification"
        );
        debug!(body = %notification.body, "notification body");

        Ok(NotificationResult::accepted(self.name()))
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
