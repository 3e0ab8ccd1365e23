//! Fetches against a local one-shot HTTP server.

use statuswatch_core::{IncidentSource, MonitorError};
use statuswatchd::StatuspageSource;
use statuswatchd::config::SourceConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const BODY: &str = r#"{"incidents":[
    {"id":"a","name":"Older","status":"resolved","created_at":"2024-06-01T08:00:00Z",
     "updated_at":"2024-06-01T09:00:00Z","impact":"minor","incident_updates":[]},
    {"id":"b","name":"Newer","status":"investigating","created_at":"2024-06-01T10:00:00Z",
     "updated_at":"2024-06-01T10:00:00Z","impact":"major","incident_updates":[]}
]}"#;

/// Serves a single response and returns the URL to request.
async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut buf = [0u8; 4096];
        let _ = stream.read(&mut buf).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    });

    format!("http://{addr}/api/v2/incidents.json")
}

fn source(url: String) -> StatuspageSource {
    StatuspageSource::new(&SourceConfig {
        status_api_url: url,
        http_timeout_secs: 5,
    })
    .expect("client should build")
}

#[tokio::test]
async fn fetch_decodes_and_sorts() {
    let url = serve_once("200 OK", BODY).await;
    let incidents = source(url).fetch().await.expect("fetch should succeed");

    let ids: Vec<_> = incidents.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn server_error_is_fetch_failure() {
    let url = serve_once("503 Service Unavailable", "{}").await;
    let result = source(url).fetch().await;

    match result {
        Err(MonitorError::FetchFailed { reason }) => assert!(reason.contains("503")),
        other => panic!("expected FetchFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn garbage_body_is_decode_failure() {
    let url = serve_once("200 OK", "<html>maintenance</html>").await;
    let result = source(url).fetch().await;
    assert!(matches!(result, Err(MonitorError::DecodeFailed { .. })));
}

#[tokio::test]
async fn unreachable_host_is_fetch_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let result = source(format!("http://{addr}/incidents.json")).fetch().await;
    assert!(matches!(result, Err(MonitorError::FetchFailed { .. })));
}
