//! Session state: access token, authenticated user, active session list.
//!
//! The token itself lives in the shared [`TokenStore`]; its presence is the
//! authentication state. The user and session list are only meaningful
//! while a token exists.

use crate::error::ClientError;
use crate::http::{ApiRequest, AuthenticatedClient};
use crate::storage::TokenStore;
use fintrack_types::{RegisterRequest, SessionDescriptor, SessionsResponse, TokenResponse, User};
use parking_lot::{Mutex, RwLock};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionLifecycle {
    LoggedOut,
    /// Token present; `user` is `None` until `/auth/me` has answered.
    Authenticated { user: Option<User> },
}

pub struct SessionStore {
    client: Arc<AuthenticatedClient>,
    user: RwLock<Option<User>>,
    sessions: RwLock<Vec<SessionDescriptor>>,
    bootstrap: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore {
    /// Wrap a client. A token already persisted triggers one background
    /// `fetch_user` when a Tokio runtime is available.
    pub fn new(client: Arc<AuthenticatedClient>) -> Arc<Self> {
        let store = Arc::new(Self {
            client,
            user: RwLock::new(None),
            sessions: RwLock::new(Vec::new()),
            bootstrap: Mutex::new(None),
        });
        if store.is_authenticated() {
            match Handle::try_current() {
                Ok(handle) => {
                    let bootstrap = store.clone();
                    let task = handle.spawn(async move { bootstrap.fetch_user().await });
                    *store.bootstrap.lock() = Some(task);
                }
                Err(_) => tracing::debug!("No runtime, skipping session bootstrap"),
            }
        }
        store
    }

    pub fn client(&self) -> &Arc<AuthenticatedClient> {
        &self.client
    }

    fn tokens(&self) -> &TokenStore {
        self.client.tokens()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens().is_present()
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens().get()
    }

    pub fn current_user(&self) -> Option<User> {
        if !self.is_authenticated() {
            return None;
        }
        self.user.read().clone()
    }

    pub fn is_superuser(&self) -> bool {
        self.current_user().is_some_and(|u| u.is_superuser)
    }

    pub fn active_sessions(&self) -> Vec<SessionDescriptor> {
        if !self.is_authenticated() {
            return Vec::new();
        }
        self.sessions.read().clone()
    }

    pub fn lifecycle(&self) -> SessionLifecycle {
        if self.is_authenticated() {
            SessionLifecycle::Authenticated { user: self.user.read().clone() }
        } else {
            SessionLifecycle::LoggedOut
        }
    }

    /// Exchange credentials for an access token, then load the user.
    /// A rejected credential comes back as the untouched `Status` error.
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<TokenResponse, ClientError> {
        let endpoints = self.client.endpoints();
        let req = ApiRequest::post(endpoints.token.as_str())
            .form([("username", identifier), ("password", secret)])
            .header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
            .without_refresh();
        let token: TokenResponse = self.client.request(req).await?.json()?;

        self.client.install_token(&token.access_token);
        tracing::info!("Logged in as {}", identifier);
        self.fetch_user().await;
        Ok(token)
    }

    /// Create an account. No local state changes.
    pub async fn register(
        &self,
        identifier: &str,
        display_name: &str,
        secret: &str,
    ) -> Result<User, ClientError> {
        let body = RegisterRequest {
            email: identifier.to_string(),
            username: display_name.to_string(),
            password: secret.to_string(),
        };
        let req = ApiRequest::post(self.client.endpoints().register.as_str())
            .json(&body)?
            .without_refresh();
        self.client.request(req).await?.json()
    }

    /// Load `/auth/me`. Failures are logged only: invalidating the session
    /// is left to the client's refresh handling.
    pub async fn fetch_user(&self) {
        if !self.is_authenticated() {
            return;
        }
        let result: Result<User, ClientError> =
            self.client.get_json(self.client.endpoints().me.as_str()).await;
        match result {
            Ok(user) => {
                if self.is_authenticated() {
                    *self.user.write() = Some(user);
                } else {
                    tracing::debug!("Session ended while fetching user, discarding");
                }
            }
            Err(e) => tracing::warn!("Failed to fetch current user: {}", e),
        }
    }

    /// The current user, waiting for the startup fetch first and calling
    /// `/auth/me` only if that left nothing behind.
    pub async fn ensure_user(&self) -> Option<User> {
        let bootstrap = self.bootstrap.lock().take();
        if let Some(task) = bootstrap {
            if let Err(e) = task.await {
                tracing::debug!("Session bootstrap did not finish: {}", e);
            }
        }
        if self.current_user().is_none() {
            self.fetch_user().await;
        }
        self.current_user()
    }

    /// Revoke the session server-side (best effort) and always clear local state.
    pub async fn logout(&self) {
        let _reset = LocalSessionReset { store: self };
        if !self.is_authenticated() {
            return;
        }
        if let Err(e) = self.client.post(self.client.endpoints().logout.as_str()).await {
            tracing::warn!("Server-side logout failed: {}", e);
        }
    }

    /// Revoke every session of this user. Local state is cleared only on success.
    ///
    /// Any 2xx counts as success; a body that is not JSON comes back as a string.
    pub async fn logout_all_devices(&self) -> Result<serde_json::Value, ClientError> {
        let resp = self.client.post(self.client.endpoints().logout_all.as_str()).await?;
        self.reset_local();
        if resp.bytes().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(resp.json().unwrap_or_else(|_| serde_json::Value::String(resp.text())))
    }

    /// Fetch and store the active session list.
    pub async fn fetch_sessions(&self) -> Result<Vec<SessionDescriptor>, ClientError> {
        let resp: SessionsResponse =
            self.client.get_json(self.client.endpoints().sessions.as_str()).await?;
        *self.sessions.write() = resp.sessions.clone();
        Ok(resp.sessions)
    }

    fn reset_local(&self) {
        self.client.clear_token();
        *self.user.write() = None;
        self.sessions.write().clear();
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("lifecycle", &self.lifecycle()).finish()
    }
}

/// Clears local session state on drop, so logout cleanup also runs when the
/// revoke call errors or the future is cancelled.
struct LocalSessionReset<'a> {
    store: &'a SessionStore,
}

impl Drop for LocalSessionReset<'_> {
    fn drop(&mut self) {
        self.store.reset_local();
    }
}
