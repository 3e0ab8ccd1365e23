//! DingTalk robot notification channel.
//!
//! Notifications are posted as Markdown messages to a custom robot webhook.
//! Every request is signed: the `sign` query parameter is the base64-encoded
//! HMAC-SHA256 of `"<timestamp_ms>\n<secret>"` keyed with the secret.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use statuswatch_core::{MonitorError, Notification, NotificationChannel, NotificationResult};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DingTalkConfig;
use crate::error::Result;

type HmacSha256 = Hmac<Sha256>;

/// Markdown message body accepted by the robot API.
#[derive(Debug, Clone, Serialize)]
pub struct MarkdownMessage<'a> {
    msgtype: &'static str,
    markdown: MarkdownContent<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct MarkdownContent<'a> {
    title: &'a str,
    text: &'a str,
}

impl<'a> MarkdownMessage<'a> {
    /// Builds the message for a notification.
    #[must_use]
    pub fn from_notification(notification: &'a Notification) -> Self {
        Self {
            msgtype: "markdown",
            markdown: MarkdownContent {
                title: notification.title.as_str(),
                text: notification.body.as_str(),
            },
        }
    }
}

/// Reply returned by the robot API.
#[derive(Debug, Clone, Deserialize)]
struct RobotReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Computes the request signature for `timestamp_ms`.
///
/// # Errors
///
/// Returns `MonitorError::NotificationFailed` if the HMAC cannot be keyed.
pub fn sign(secret: &str, timestamp_ms: i64) -> statuswatch_core::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
        MonitorError::NotificationFailed {
            reason: format!("failed to initialize request signer: {e}"),
        }
    })?;
    mac.update(format!("{timestamp_ms}\n{secret}").as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// A signed DingTalk robot channel.
#[derive(Debug, Clone)]
pub struct DingTalkChannel {
    config: DingTalkConfig,
    client: reqwest::Client,
}

impl DingTalkChannel {
    /// Creates a channel with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: DingTalkConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { config, client })
    }

    /// Returns the webhook URL, without credentials.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.webhook_url
    }

    /// Interprets the HTTP status and reply body of a robot request.
    fn evaluate_reply(&self, status: reqwest::StatusCode, body: &str) -> NotificationResult {
        if !status.is_success() {
            return NotificationResult::rejected(self.name(), format!("HTTP {status}: {body}"))
                .with_http_status(status.as_u16());
        }

        match serde_json::from_str::<RobotReply>(body) {
            Ok(reply) if reply.errcode != 0 => NotificationResult::rejected(
                self.name(),
                format!("errcode {}: {}", reply.errcode, reply.errmsg),
            )
            .with_http_status(status.as_u16()),
            Ok(_) => NotificationResult::accepted(self.name()).with_http_status(status.as_u16()),
            Err(e) => {
                debug!(error = %e, body = %body, "unrecognized robot reply");
                NotificationResult::accepted(self.name())
                    .with_http_status(status.as_u16())
                    .with_detail("unrecognized reply body")
            }
        }
    }
}

#[async_trait]
impl NotificationChannel for DingTalkChannel {
    fn name(&self) -> &str {
        "dingtalk"
    }

    async fn send(&self, notification: &Notification) -> statuswatch_core::Result<NotificationResult> {
        let timestamp = Utc::now().timestamp_millis();
        let signature = sign(&self.config.secret, timestamp)?;
        let message = MarkdownMessage::from_notification(notification);

        debug!(
            title = %notification.title,
            bytes = notification.body.len(),
            timestamp,
            "sending DingTalk notification"
        );

        let response = self
            .client
            .post(&self.config.webhook_url)
            .query(&[
                ("access_token", self.config.access_token.as_str()),
                ("timestamp", timestamp.to_string().as_str()),
                ("sign", signature.as_str()),
            ])
            .json(&message)
            .send()
            .await
            .map_err(|e| MonitorError::NotificationFailed {
                reason: e.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MonitorError::NotificationFailed {
                reason: format!("failed to read reply: {}", e.without_url()),
            })?;
        info!(status = %status, reply = %body, "DingTalk reply");

        Ok(self.evaluate_reply(status, &body))
    }
}
