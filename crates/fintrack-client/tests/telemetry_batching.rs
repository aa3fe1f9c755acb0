#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test: panics are the assertion mechanism")]

use fintrack_client::{ConsoleSink, Telemetry, TelemetryConfig, TokenStore};
use fintrack_types::{LogEntry, LogLevel, TelemetryError};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingConsole {
    entries: Mutex<Vec<LogEntry>>,
    failures: Mutex<Vec<String>>,
}

impl ConsoleSink for RecordingConsole {
    fn write(&self, entry: &LogEntry) {
        self.entries.lock().push(entry.clone());
    }

    fn delivery_failed(&self, error: &TelemetryError) {
        self.failures.lock().push(error.to_string());
    }
}

fn sync_config(batch_interval: Duration) -> TelemetryConfig {
    TelemetryConfig {
        console_level: LogLevel::Debug,
        backend_level: LogLevel::Warn,
        enable_sync: true,
        batch_size: 10,
        batch_interval,
        ..TelemetryConfig::default()
    }
}

fn telemetry(
    server: &MockServer,
    config: TelemetryConfig,
    tokens: Option<Arc<TokenStore>>,
) -> (Telemetry, Arc<RecordingConsole>) {
    let console = Arc::new(RecordingConsole::default());
    let mut builder = Telemetry::builder(config).base_url(server.uri()).console(console.clone());
    if let Some(tokens) = tokens {
        builder = builder.token_store(tokens);
    }
    (builder.build().expect("valid telemetry"), console)
}

async fn delivered_batches(server: &MockServer) -> Vec<Vec<Value>> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .filter(|r| r.url.path() == "/logs/batch")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).expect("json batch");
            body["logs"].as_array().cloned().expect("logs array")
        })
        .collect()
}

#[tokio::test]
async fn test_full_batch_flushes_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logs/batch"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let tokens = Arc::new(TokenStore::in_memory());
    tokens.set("tok1");
    let (telemetry, _) = telemetry(&server, sync_config(Duration::from_secs(60)), Some(tokens));

    for i in 0..10 {
        telemetry.warn(format!("slow response {i}"), None);
    }
    assert_eq!(telemetry.buffered(), 0);
    telemetry.shutdown().await;

    let batches = delivered_batches(&server).await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 10);
    assert_eq!(batches[0][0]["message"], "slow response 0");
    assert_eq!(batches[0][9]["level"], "warn");
}

#[tokio::test]
async fn test_debug_stays_local_under_warn_threshold() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logs/batch"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (telemetry, console) = telemetry(&server, sync_config(Duration::from_secs(60)), None);

    telemetry.debug("cache hit", None);
    telemetry.error("wallet sync failed", None);
    telemetry.flush().await;

    let batches = delivered_batches(&server).await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0]["message"], "wallet sync failed");
    let messages: Vec<String> =
        console.entries.lock().iter().map(|e| e.message().to_string()).collect();
    assert_eq!(messages, ["cache hit", "wallet sync failed"]);
}

#[tokio::test]
async fn test_timer_flushes_partial_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logs/batch"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (telemetry, _) = telemetry(&server, sync_config(Duration::from_millis(100)), None);

    telemetry.warn("first", None);
    telemetry.warn("second", None);
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(telemetry.buffered(), 0);
    assert!(!telemetry.has_pending_timer());
    let batches = delivered_batches(&server).await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
}

#[tokio::test]
async fn test_rejected_batch_is_reported_and_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logs/batch"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let (telemetry, console) = telemetry(&server, sync_config(Duration::from_secs(60)), None);

    telemetry.error("boom", None);
    telemetry.flush().await;

    assert_eq!(telemetry.buffered(), 0);
    let failures = console.failures.lock();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("401"));
}

#[tokio::test]
async fn test_entries_carry_page_and_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logs/batch"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let (telemetry, _) = telemetry(&server, sync_config(Duration::from_secs(60)), None);

    telemetry.set_page("/analysis");
    telemetry.set_request_id("req-9");
    telemetry.api("GET", "/analysis/monthly", 500, 120);
    telemetry.flush().await;

    let batches = delivered_batches(&server).await;
    let entry = &batches[0][0];
    assert_eq!(entry["url"], "/analysis");
    assert_eq!(entry["requestId"], "req-9");
    assert_eq!(entry["context"]["durationMs"], 120);
    assert!(entry["timestamp"].is_string());
    assert!(entry["userAgent"].is_string());
}

#[tokio::test]
async fn test_log_during_in_flight_flush_goes_to_next_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logs/batch"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .expect(2)
        .mount(&server)
        .await;
    let (telemetry, _) = telemetry(&server, sync_config(Duration::from_secs(60)), None);

    telemetry.warn("before flush", None);
    let in_flight = {
        let telemetry = telemetry.clone();
        tokio::spawn(async move { telemetry.flush().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    telemetry.warn("during flush", None);
    assert_eq!(telemetry.buffered(), 1);

    in_flight.await.expect("flush task completes");
    telemetry.flush().await;

    let batches = delivered_batches(&server).await;
    assert_eq!(batches.len(), 2);
    let messages: Vec<Vec<&str>> = batches
        .iter()
        .map(|b| b.iter().map(|e| e["message"].as_str().expect("message")).collect())
        .collect();
    assert_eq!(messages, [vec!["before flush"], vec!["during flush"]]);
    assert_eq!(telemetry.buffered(), 0);
}
