//! Authenticated user and session-list models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User returned by `GET /auth/me`.
///
/// Only `email` is guaranteed; everything else falls back to defaults so older
/// backends that omit fields still deserialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    pub username: String,
    pub is_superuser: bool,
    pub created_at: Option<String>,
    /// Fields this client does not model explicitly
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the active-session list (one per signed-in device).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SessionDescriptor {
    pub id: Option<Value>,
    pub created_at: Option<String>,
    pub expires_at: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub is_current: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `GET /auth/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionsResponse {
    #[serde(default)]
    pub sessions: Vec<SessionDescriptor>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_with_partial_fields() {
        let user: User =
            serde_json::from_str(r#"{"email":"a@example.com","is_superuser":false}"#).unwrap();
        assert_eq!(user.email, "a@example.com");
        assert!(!user.is_superuser);
        assert_eq!(user.id, None);
    }

    #[test]
    fn test_unknown_user_fields_are_kept() {
        let user: User = serde_json::from_str(
            r#"{"id":7,"email":"a@example.com","username":"a","is_superuser":true,"locale":"id"}"#,
        )
        .unwrap();
        assert_eq!(user.id, Some(7));
        assert_eq!(user.extra.get("locale"), Some(&Value::String("id".to_string())));
    }

    #[test]
    fn test_sessions_response() {
        let resp: SessionsResponse = serde_json::from_str(
            r#"{"sessions":[{"id":1,"user_agent":"cli","is_current":true},{"id":2}]}"#,
        )
        .unwrap();
        assert_eq!(resp.sessions.len(), 2);
        assert!(resp.sessions[0].is_current);
        assert!(!resp.sessions[1].is_current);
    }
}
