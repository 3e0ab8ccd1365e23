//! Statuspage v2 incident source.

use async_trait::async_trait;
use statuswatch_core::{
    Incident, IncidentSource, IncidentsResponse, MonitorError, sort_newest_first,
};
use tracing::debug;

use crate::config::SourceConfig;
use crate::error::Result;

/// Fetches incidents from a Statuspage `incidents.json` endpoint.
#[derive(Debug, Clone)]
pub struct StatuspageSource {
    url: String,
    client: reqwest::Client,
}

impl StatuspageSource {
    /// Creates a source for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("statuswatchd/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            url: config.status_api_url.clone(),
            client,
        })
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IncidentSource for StatuspageSource {
    fn name(&self) -> &str {
        "statuspage"
    }

    async fn fetch(&self) -> statuswatch_core::Result<Vec<Incident>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| MonitorError::FetchFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::FetchFailed {
                reason: format!("unexpected status {status} from {}", self.url),
            });
        }

        let body = response.bytes().await.map_err(|e| MonitorError::FetchFailed {
            reason: format!("failed to read response body: {e}"),
        })?;
        debug!(url = %self.url, status = %status, bytes = body.len(), "fetched status page");

        decode_incidents(&body)
    }
}

/// Decodes an `incidents.json` payload, newest incident first.
///
/// # Errors
///
/// Returns `MonitorError::DecodeFailed` if the payload is malformed.
pub fn decode_incidents(body: &[u8]) -> statuswatch_core::Result<Vec<Incident>> {
    let response: IncidentsResponse = serde_json::from_slice(body)?;
    let mut incidents = response.incidents;
    sort_newest_first(&mut incidents);
    Ok(incidents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "page": {"id": "yh6f0r4529hb", "name": "Cloudflare"},
        "incidents": [
            {
                "id": "older",
                "name": "Delayed analytics",
                "status": "resolved",
                "created_at": "2024-06-01T08:00:00.000Z",
                "updated_at": "2024-06-01T09:00:00.000Z",
                "monitoring_at": null,
                "resolved_at": "2024-06-01T09:00:00.000Z",
                "impact": "minor",
                "shortlink": "https://stspg.io/older",
                "incident_updates": []
            },
            {
                "id": "newer",
                "name": "Elevated 5xx errors",
                "status": "investigating",
                "created_at": "2024-06-01T10:00:00.000Z",
                "updated_at": "2024-06-01T10:05:00.000Z",
                "monitoring_at": null,
                "resolved_at": null,
                "impact": "major",
                "shortlink": "https://stspg.io/newer",
                "incident_updates": [{
                    "id": "u1",
                    "status": "investigating",
                    "body": "We are investigating.",
                    "created_at": "2024-06-01T10:05:00.000Z",
                    "updated_at": "2024-06-01T10:05:00.000Z"
                }]
            }
        ]
    }"#;

    #[test]
    fn test_decode_sorts_newest_first() {
        let incidents = decode_incidents(PAYLOAD.as_bytes()).expect("should decode");
        let ids: Vec<_> = incidents.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older"]);
        assert_eq!(incidents[0].updates.len(), 1);
    }

    #[test]
    fn test_decode_empty_list() {
        let incidents = decode_incidents(br#"{"incidents": []}"#).expect("should decode");
        assert!(incidents.is_empty());
    }

    #[test]
    fn test_malformed_payload_is_decode_error() {
        let result = decode_incidents(b"<html>502 Bad Gateway</html>");
        assert!(matches!(result, Err(MonitorError::DecodeFailed { .. })));
    }

    #[test]
    fn test_missing_required_field_is_decode_error() {
        let result = decode_incidents(br#"{"incidents": [{"id": "x"}]}"#);
        assert!(matches!(result, Err(MonitorError::DecodeFailed { .. })));
    }

    #[test]
    fn test_source_uses_configured_url() {
        let config = SourceConfig {
            status_api_url: "http://127.0.0.1:9/incidents.json".to_string(),
            http_timeout_secs: 1,
        };
        let source = StatuspageSource::new(&config).expect("client should build");
        assert_eq!(source.url(), "http://127.0.0.1:9/incidents.json");
        assert_eq!(source.name(), "statuspage");
    }
}
