//! Error types for the FinTrack session client.

use fintrack_types::AuthError;
use thiserror::Error;

/// Errors that can occur when talking to the FinTrack API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed before a response arrived.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body (usually a JSON `detail`).
        body: String,
        /// Server-assigned correlation id, if the response carried one.
        request_id: Option<String>,
    },

    /// The refresh endpoint failed; the session was cleared.
    #[error("Token refresh failed: {message}")]
    RefreshFailed {
        /// HTTP status of the refresh call, absent for transport failures.
        status: Option<u16>,
        /// Error message shared by every request that waited on the refresh.
        message: String,
    },

    /// Server returned an invalid or unparseable response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request path or base URL could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Durable token storage failed.
    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Coarse classification used by callers deciding what to show the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Backend rejected credentials or input; show it on the form.
    Credential,
    /// Refresh failed and the session was cleared.
    RefreshFailed,
    /// Anything else (5xx, network, decode).
    Other,
}

impl ClientError {
    /// HTTP status code, if the error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RefreshFailed { status, .. } => *status,
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401) && !matches!(self, Self::RefreshFailed { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RefreshFailed { .. } => ErrorCategory::RefreshFailed,
            Self::Status { status, .. } if (400..500).contains(status) => {
                ErrorCategory::Credential
            }
            _ => ErrorCategory::Other,
        }
    }

    /// Convert into the serializable error of `fintrack-types`.
    pub fn to_typed(&self) -> AuthError {
        match self {
            Self::Request(e) => AuthError::Network { message: e.to_string() },
            Self::Status { status, body, .. } if (400..500).contains(status) => {
                AuthError::CredentialsRejected { status: *status, message: body.clone() }
            }
            Self::Status { status, body, .. } => {
                AuthError::RequestFailed { status: *status, message: body.clone() }
            }
            Self::RefreshFailed { status, message } => {
                AuthError::RefreshFailed { status: *status, message: message.clone() }
            }
            Self::InvalidResponse(m) | Self::InvalidUrl(m) => {
                AuthError::InvalidResponse { message: m.clone() }
            }
            Self::Storage(m) => AuthError::Storage { message: m.clone() },
        }
    }
}
