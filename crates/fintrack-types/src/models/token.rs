//! Token endpoint payloads.

use serde::{Deserialize, Serialize};

/// Response of `POST /auth/token` and `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// Short-lived bearer credential
    pub access_token: String,
    /// Token type (usually "bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    /// Login identifier
    pub email: String,
    /// Display name
    pub username: String,
    /// Plain-text secret, sent over TLS only
    pub password: String,
}
