//! Client telemetry pipeline.
//!
//! Leveled entries go to a console sink and, when backend sync is enabled,
//! into a buffer shipped to `POST /logs/batch` by size or by timer. Delivery
//! uses its own `reqwest::Client`, never the authenticated client, so a 401
//! from the ingestion endpoint cannot re-enter the refresh logic.

mod config;
mod hooks;
mod sink;

pub use config::TelemetryConfig;
pub use sink::{ConsoleSink, TracingConsole};

use crate::error::ClientError;
use crate::http::RequestIdObserver;
use crate::storage::TokenStore;
use fintrack_types::models::MAX_BATCH_ENTRIES;
use fintrack_types::{ConfigError, LogBatch, LogEntry, LogLevel, TelemetryError};
use parking_lot::{Mutex, RwLock};
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Structured context attached to an entry.
pub type Context = Map<String, Value>;

#[derive(Default)]
struct BatchState {
    entries: Vec<LogEntry>,
    timer: Option<JoinHandle<()>>,
    /// Bumped each time a timer is armed; a timer only flushes while it matches.
    timer_generation: u64,
}

struct Inner {
    config: TelemetryConfig,
    http: reqwest::Client,
    ingest_url: String,
    tokens: Option<Arc<TokenStore>>,
    console: Arc<dyn ConsoleSink>,
    batch: Mutex<BatchState>,
    request_id: RwLock<Option<String>>,
    page: RwLock<String>,
    deliveries: Mutex<Vec<JoinHandle<()>>>,
}

/// Cheap to clone; all clones share one buffer.
#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<Inner>,
}

pub struct TelemetryBuilder {
    config: TelemetryConfig,
    base_url: String,
    tokens: Option<Arc<TokenStore>>,
    console: Arc<dyn ConsoleSink>,
    http: Option<reqwest::Client>,
}

impl TelemetryBuilder {
    /// API base URL the ingestion endpoint is resolved against.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Token source used to identify the sender. Read-only.
    #[must_use]
    pub fn token_store(mut self, tokens: Arc<TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    #[must_use]
    pub fn console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = console;
        self
    }

    #[must_use]
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<Telemetry, ConfigError> {
        self.config.validate()?;
        let ingest_url = if self.config.endpoint.starts_with("http://")
            || self.config.endpoint.starts_with("https://")
        {
            self.config.endpoint.clone()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), self.config.endpoint)
        };
        url::Url::parse(&ingest_url).map_err(|e| ConfigError::invalid("endpoint", e.to_string()))?;

        Ok(Telemetry {
            inner: Arc::new(Inner {
                config: self.config,
                http: self.http.unwrap_or_default(),
                ingest_url,
                tokens: self.tokens,
                console: self.console,
                batch: Mutex::new(BatchState::default()),
                request_id: RwLock::new(None),
                page: RwLock::new("/".to_string()),
                deliveries: Mutex::new(Vec::new()),
            }),
        })
    }
}

impl Telemetry {
    pub fn builder(config: TelemetryConfig) -> TelemetryBuilder {
        TelemetryBuilder {
            config,
            base_url: String::new(),
            tokens: None,
            console: Arc::new(TracingConsole),
            http: None,
        }
    }

    /// Pipeline with the default tracing console sink.
    pub fn new(config: TelemetryConfig, base_url: &str) -> Result<Self, ConfigError> {
        Self::builder(config).base_url(base_url).build()
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.inner.config
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>, context: Option<Context>) {
        self.emit(self.entry(level, message, context));
    }

    pub fn debug(&self, message: impl Into<String>, context: Option<Context>) {
        self.log(LogLevel::Debug, message, context);
    }

    pub fn info(&self, message: impl Into<String>, context: Option<Context>) {
        self.log(LogLevel::Info, message, context);
    }

    pub fn warn(&self, message: impl Into<String>, context: Option<Context>) {
        self.log(LogLevel::Warn, message, context);
    }

    pub fn error(&self, message: impl Into<String>, context: Option<Context>) {
        self.log(LogLevel::Error, message, context);
    }

    /// Component lifecycle event (mounted, unmounted, ...).
    pub fn component(&self, component: &str, event: &str, data: Option<Context>) {
        let entry = self
            .entry(LogLevel::Debug, format!("[{component}] {event}"), data)
            .with_component(component);
        self.emit(entry);
    }

    /// Outcome of an API call; failures (status >= 400) are warnings.
    pub fn api(&self, method: &str, url: &str, status: u16, duration_ms: u64) {
        let level = if status >= 400 { LogLevel::Warn } else { LogLevel::Debug };
        let mut context = Context::new();
        context.insert("status".to_string(), json!(status));
        context.insert("durationMs".to_string(), json!(duration_ms));
        self.log(level, format!("API {method} {url}"), Some(context));
    }

    pub fn action(&self, action: &str, data: Option<Context>) {
        self.log(LogLevel::Info, format!("User action: {action}"), data);
    }

    /// Error-level entry carrying the error's type name, source chain, and a backtrace.
    pub fn capture_error<E>(&self, error: &E, context: Option<Context>)
    where
        E: std::error::Error + ?Sized,
    {
        let mut context = context.unwrap_or_default();
        let mut sources = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            sources.push(Value::String(cause.to_string()));
            source = cause.source();
        }
        context.insert("name".to_string(), json!(std::any::type_name::<E>()));
        context.insert(
            "stack".to_string(),
            json!(std::backtrace::Backtrace::capture().to_string()),
        );
        if !sources.is_empty() {
            context.insert("sources".to_string(), Value::Array(sources));
        }
        self.log(LogLevel::Error, error.to_string(), Some(context));
    }

    /// Correlation id stamped on every subsequent entry.
    pub fn set_request_id(&self, request_id: impl Into<String>) {
        *self.inner.request_id.write() = Some(request_id.into());
    }

    pub fn request_id(&self) -> Option<String> {
        self.inner.request_id.read().clone()
    }

    /// Observer for [`crate::http::AuthenticatedClient::with_request_id_observer`].
    pub fn request_id_observer(&self) -> RequestIdObserver {
        let telemetry = self.clone();
        Arc::new(move |id: &str| telemetry.set_request_id(id))
    }

    /// Record the active route; stamped as the entry's `url`.
    pub fn set_page(&self, path: impl Into<String>) {
        *self.inner.page.write() = path.into();
    }

    pub fn page(&self) -> String {
        self.inner.page.read().clone()
    }

    /// Entries waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.inner.batch.lock().entries.len()
    }

    pub fn has_pending_timer(&self) -> bool {
        self.inner.batch.lock().timer.is_some()
    }

    /// Ship everything buffered now and wait for that delivery.
    pub async fn flush(&self) {
        let batch = {
            let mut state = self.inner.batch.lock();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            std::mem::take(&mut state.entries)
        };
        self.deliver(batch).await;
    }

    /// Final flush (the equivalent of page unload), then wait for any
    /// background deliveries still in flight.
    pub async fn shutdown(&self) {
        self.flush().await;
        let pending = std::mem::take(&mut *self.inner.deliveries.lock());
        for handle in pending {
            if let Err(e) = handle.await {
                tracing::debug!("Log delivery task ended abnormally: {}", e);
            }
        }
    }

    fn entry(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<Context>,
    ) -> LogEntry {
        LogEntry::new(
            level,
            message,
            context.unwrap_or_default(),
            self.page(),
            self.inner.config.user_agent.as_str(),
            self.request_id(),
        )
    }

    fn emit(&self, entry: LogEntry) {
        let config = &self.inner.config;
        if entry.level().meets(config.console_level) {
            self.inner.console.write(&entry);
        }
        if config.enable_sync && entry.level().meets(config.backend_level) {
            self.enqueue(entry);
        }
    }

    fn enqueue(&self, entry: LogEntry) {
        let full = {
            let mut state = self.inner.batch.lock();
            state.entries.push(entry);
            if state.entries.len() >= self.inner.config.batch_size {
                if let Some(timer) = state.timer.take() {
                    timer.abort();
                }
                Some(std::mem::take(&mut state.entries))
            } else {
                if state.timer.is_none() {
                    state.timer_generation = state.timer_generation.wrapping_add(1);
                    state.timer = self.spawn_timer(state.timer_generation);
                }
                None
            }
        };
        if let Some(batch) = full {
            self.spawn_delivery(batch);
        }
    }

    fn spawn_timer(&self, generation: u64) -> Option<JoinHandle<()>> {
        let handle = Handle::try_current().ok()?;
        let telemetry = self.clone();
        let interval = self.inner.config.batch_interval;
        Some(handle.spawn(async move {
            tokio::time::sleep(interval).await;
            telemetry.flush_from_timer(generation).await;
        }))
    }

    /// Timer-driven flush. Takes the timer slot without aborting it: the
    /// slot holds this very task. A timer that lost its slot (aborted by a
    /// flush but already past its sleep) leaves the buffer alone.
    async fn flush_from_timer(&self, generation: u64) {
        let batch = {
            let mut state = self.inner.batch.lock();
            if state.timer.is_none() || state.timer_generation != generation {
                return;
            }
            state.timer = None;
            std::mem::take(&mut state.entries)
        };
        self.deliver(batch).await;
    }

    #[cfg(test)]
    fn timer_generation(&self) -> u64 {
        self.inner.batch.lock().timer_generation
    }

    fn spawn_delivery(&self, batch: Vec<LogEntry>) {
        let Ok(handle) = Handle::try_current() else {
            self.inner.console.delivery_failed(&TelemetryError::DeliveryFailed {
                entries: batch.len(),
                message: "no async runtime available".to_string(),
            });
            return;
        };
        let telemetry = self.clone();
        let task = handle.spawn(async move { telemetry.deliver(batch).await });
        let mut deliveries = self.inner.deliveries.lock();
        deliveries.retain(|h| !h.is_finished());
        deliveries.push(task);
    }

    async fn deliver(&self, batch: Vec<LogEntry>) {
        for chunk in batch.chunks(MAX_BATCH_ENTRIES) {
            if let Err(e) = self.send_batch(chunk).await {
                self.inner.console.delivery_failed(&e);
            }
        }
    }

    async fn send_batch(&self, logs: &[LogEntry]) -> Result<(), TelemetryError> {
        let body = LogBatch { logs: logs.to_vec() };
        let mut request = self.inner.http.post(&self.inner.ingest_url).json(&body);
        if let Some(token) = self.inner.tokens.as_ref().and_then(|t| t.get()) {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let resp = request.send().await.map_err(|e| TelemetryError::DeliveryFailed {
            entries: logs.len(),
            message: ClientError::from(e).to_string(),
        })?;
        if !resp.status().is_success() {
            return Err(TelemetryError::Rejected { status: resp.status().as_u16() });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("config", &self.inner.config)
            .field("ingest_url", &self.inner.ingest_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<LogEntry>>);

    impl ConsoleSink for Recorder {
        fn write(&self, entry: &LogEntry) {
            self.0.lock().push(entry.clone());
        }
    }

    fn offline(console: Arc<Recorder>, enable_sync: bool) -> Telemetry {
        let config = TelemetryConfig {
            enable_sync,
            batch_interval: Duration::from_secs(3600),
            ..TelemetryConfig::default()
        };
        Telemetry::builder(config)
            .base_url("http://127.0.0.1:9")
            .console(console)
            .build()
            .unwrap()
    }

    #[test]
    fn test_correlation_and_page_are_stamped() {
        let console = Arc::new(Recorder::default());
        let telemetry = offline(console.clone(), false);

        telemetry.info("before", None);
        (telemetry.request_id_observer())("req-1");
        telemetry.set_page("/wallets");
        telemetry.info("after", None);

        let entries = console.0.lock();
        assert_eq!(entries[0].request_id(), None);
        assert_eq!(entries[0].url(), "/");
        assert_eq!(entries[1].request_id(), Some("req-1"));
        assert_eq!(entries[1].url(), "/wallets");
    }

    #[test]
    fn test_api_level_inference() {
        let console = Arc::new(Recorder::default());
        let telemetry = offline(console.clone(), false);

        telemetry.api("GET", "/wallets", 200, 12);
        telemetry.api("POST", "/transactions", 422, 40);

        let entries = console.0.lock();
        assert_eq!(entries[0].level(), LogLevel::Debug);
        assert_eq!(entries[1].level(), LogLevel::Warn);
        assert_eq!(entries[1].message(), "API POST /transactions");
        assert_eq!(entries[1].context()["status"], json!(422));
    }

    #[test]
    fn test_component_entry_names_component() {
        let console = Arc::new(Recorder::default());
        let telemetry = offline(console.clone(), false);

        telemetry.component("WalletList", "mounted", None);

        let entries = console.0.lock();
        assert_eq!(entries[0].message(), "[WalletList] mounted");
        assert_eq!(entries[0].component(), Some("WalletList"));
    }

    #[test]
    fn test_capture_error_records_type_name() {
        let console = Arc::new(Recorder::default());
        let telemetry = offline(console.clone(), false);
        let err = ClientError::Storage("disk full".to_string());

        telemetry.capture_error(&err, None);

        let entries = console.0.lock();
        assert_eq!(entries[0].level(), LogLevel::Error);
        assert!(entries[0].message().contains("disk full"));
        assert!(entries[0].context()["name"].as_str().unwrap().contains("ClientError"));
    }

    #[test]
    fn test_sync_disabled_never_buffers() {
        let console = Arc::new(Recorder::default());
        let telemetry = offline(console, false);
        telemetry.error("boom", None);
        assert_eq!(telemetry.buffered(), 0);
    }

    #[tokio::test]
    async fn test_first_entry_arms_single_timer() {
        let console = Arc::new(Recorder::default());
        let telemetry = offline(console, true);

        telemetry.warn("one", None);
        assert!(telemetry.has_pending_timer());
        telemetry.warn("two", None);
        assert_eq!(telemetry.buffered(), 2);

        // unreachable endpoint: delivery fails quietly and nothing is re-queued
        telemetry.flush().await;
        assert_eq!(telemetry.buffered(), 0);
        assert!(!telemetry.has_pending_timer());
    }

    #[tokio::test]
    async fn test_superseded_timer_leaves_fresh_entries_alone() {
        let console = Arc::new(Recorder::default());
        let telemetry = offline(console, true);

        telemetry.warn("first", None);
        let stale = telemetry.timer_generation();
        telemetry.flush().await;
        telemetry.warn("second", None);
        assert_ne!(telemetry.timer_generation(), stale);

        // the aborted first timer waking late must not steal the slot or the entry
        telemetry.flush_from_timer(stale).await;
        assert_eq!(telemetry.buffered(), 1);
        assert!(telemetry.has_pending_timer());

        telemetry.flush_from_timer(telemetry.timer_generation()).await;
        assert_eq!(telemetry.buffered(), 0);
        assert!(!telemetry.has_pending_timer());
    }
}
