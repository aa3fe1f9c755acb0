//! Client log entries and the batch payload accepted by `POST /logs/batch`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Longest message the ingestion endpoint accepts.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Largest batch the ingestion endpoint accepts.
pub const MAX_BATCH_ENTRIES: usize = 50;

/// Longest page path accepted by the ingestion endpoint.
pub const MAX_URL_CHARS: usize = 500;

/// Longest user agent accepted by the ingestion endpoint.
pub const MAX_USER_AGENT_CHARS: usize = 500;

/// Longest component name accepted by the ingestion endpoint.
pub const MAX_COMPONENT_CHARS: usize = 100;

/// Severity of a log entry. Ordering follows severity, so thresholds compare with `>=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Whether an entry at this level passes a `threshold`.
    pub fn meets(self, threshold: Self) -> bool {
        self >= threshold
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// A single client-side log event. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    level: LogLevel,
    message: String,
    context: Map<String, Value>,
    timestamp: DateTime<Utc>,
    /// Page path (route) active when the entry was created
    url: String,
    user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<String>,
}

impl LogEntry {
    /// Build an entry stamped with the current time. Text fields are clamped
    /// to the ingestion limits on a character boundary.
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        context: Map<String, Value>,
        url: impl Into<String>,
        user_agent: impl Into<String>,
        request_id: Option<String>,
    ) -> Self {
        Self {
            level,
            message: clamp(message.into(), MAX_MESSAGE_CHARS),
            context,
            timestamp: Utc::now(),
            url: clamp(url.into(), MAX_URL_CHARS),
            user_agent: clamp(user_agent.into(), MAX_USER_AGENT_CHARS),
            request_id,
            component: None,
        }
    }

    /// Attach the emitting component's name.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(clamp(component.into(), MAX_COMPONENT_CHARS));
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }
}

fn clamp(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}

/// Body of `POST /logs/batch`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LogBatch {
    pub logs: Vec<LogEntry>,
}
