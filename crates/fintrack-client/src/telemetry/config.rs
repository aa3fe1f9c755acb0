//! Telemetry pipeline configuration.

use crate::config::Environment;
use fintrack_types::models::MAX_BATCH_ENTRIES;
use fintrack_types::{ConfigError, LogLevel};
use std::time::Duration;

const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_BATCH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Minimum level written to the console sink
    pub console_level: LogLevel,
    /// Minimum level shipped to the ingestion endpoint
    pub backend_level: LogLevel,
    /// Ingestion path (relative to the API base URL) or absolute URL
    pub endpoint: String,
    /// Buffered entries that trigger an immediate flush
    pub batch_size: usize,
    /// Longest time an entry waits in the buffer
    pub batch_interval: Duration,
    /// Ship entries to the backend at all
    pub enable_sync: bool,
    /// Stamped on every entry
    pub user_agent: String,
}

impl TelemetryConfig {
    /// Development logs everything locally and ships nothing; production
    /// trims the console to `info` and ships `warn` and above.
    pub fn for_environment(env: Environment) -> Self {
        let (console_level, enable_sync) = match env {
            Environment::Development => (LogLevel::Debug, false),
            Environment::Production => (LogLevel::Info, true),
        };
        Self {
            console_level,
            backend_level: LogLevel::Warn,
            endpoint: "/logs/batch".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_interval: DEFAULT_BATCH_INTERVAL,
            enable_sync,
            user_agent: default_user_agent(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_ENTRIES {
            return Err(ConfigError::invalid(
                "batch_size",
                format!("must be between 1 and {MAX_BATCH_ENTRIES}"),
            ));
        }
        if self.batch_interval.is_zero() {
            return Err(ConfigError::invalid("batch_interval", "must be greater than zero"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("endpoint", "must not be empty"));
        }
        Ok(())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

fn default_user_agent() -> String {
    format!("fintrack-client/{} ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS)
}
