//! Authentication and session errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the session layer.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum AuthError {
    /// Backend rejected the supplied credentials (login or registration)
    #[error("Credentials rejected ({status}): {message}")]
    CredentialsRejected {
        /// HTTP status returned by the backend
        status: u16,
        /// Backend detail message
        message: String,
    },

    /// Access token expired and could not be renewed
    #[error("Session expired")]
    SessionExpired,

    /// The refresh endpoint failed; the session has been cleared
    #[error("Token refresh failed{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    RefreshFailed {
        /// HTTP status of the refresh call, absent for transport failures
        status: Option<u16>,
        /// Details about the refresh failure
        message: String,
    },

    /// Any other non-success response from the API
    #[error("Request failed ({status}): {message}")]
    RequestFailed {
        /// HTTP status code
        status: u16,
        /// Response body or detail message
        message: String,
    },

    /// The request never produced a response
    #[error("Network error: {message}")]
    Network {
        /// Transport failure description
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Decode failure description
        message: String,
    },

    /// Durable token storage could not be read or written
    #[error("Token storage error: {message}")]
    Storage {
        /// Description of the storage failure
        message: String,
    },
}

impl AuthError {
    /// Whether the error ended the session (the UI should show the login screen).
    pub const fn ends_session(&self) -> bool {
        matches!(self, Self::RefreshFailed { .. } | Self::SessionExpired)
    }

    /// Whether the error should be shown to the user as a form error.
    pub const fn is_user_facing(&self) -> bool {
        matches!(self, Self::CredentialsRejected { .. } | Self::RefreshFailed { .. })
    }
}
