//! Console sink for client log entries.

use fintrack_types::{LogEntry, LogLevel, TelemetryError};

/// Local output for entries above the console threshold.
pub trait ConsoleSink: Send + Sync {
    fn write(&self, entry: &LogEntry);

    /// A batch could not be delivered. Telemetry failures only ever land here.
    fn delivery_failed(&self, error: &TelemetryError) {
        tracing::error!(
            target: "fintrack::console",
            "[Logger] Failed to send logs to backend: {}",
            error
        );
    }
}

/// Forwards entries to `tracing` under the `fintrack::console` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn write(&self, entry: &LogEntry) {
        let context = serde_json::Value::Object(entry.context().clone());
        let request_id = entry.request_id().unwrap_or("-");
        match entry.level() {
            LogLevel::Debug => tracing::debug!(
                target: "fintrack::console",
                url = entry.url(),
                request_id,
                %context,
                "{}",
                entry.message()
            ),
            LogLevel::Info => tracing::info!(
                target: "fintrack::console",
                url = entry.url(),
                request_id,
                %context,
                "{}",
                entry.message()
            ),
            LogLevel::Warn => tracing::warn!(
                target: "fintrack::console",
                url = entry.url(),
                request_id,
                %context,
                "{}",
                entry.message()
            ),
            LogLevel::Error => tracing::error!(
                target: "fintrack::console",
                url = entry.url(),
                request_id,
                %context,
                "{}",
                entry.message()
            ),
        }
    }
}
