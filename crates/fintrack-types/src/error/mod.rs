//! Typed error definitions for FinTrack.
//!
//! Each domain has its own error enum. All errors are:
//!
//! - **Serializable** so a UI layer can render them
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants

mod auth;
mod config;
mod telemetry;

pub use auth::AuthError;
pub use config::ConfigError;
pub use telemetry::TelemetryError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps an authentication or session error
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Wraps a telemetry delivery error
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = TypedError::Auth(AuthError::RefreshFailed {
            status: Some(401),
            message: "refresh token revoked".to_string(),
        });

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Auth"));
        assert!(json.contains("refresh token revoked"));

        let deserialized: TypedError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::ValidationError {
            field: "batch_size".to_string(),
            message: "must be between 1 and 50".to_string(),
        };

        let msg = format!("{}", TypedError::from(err));
        assert!(msg.contains("batch_size"));
        assert!(msg.starts_with("Config error"));
    }
}
