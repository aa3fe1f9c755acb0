use super::refresh::{wait_for_refresh, RefreshCoordinator, RefreshFailure, RefreshTicket};
use super::request::{request_id, ApiRequest, ApiResponse, RequestBody};
use crate::config::{AuthEndpoints, ClientConfig};
use crate::error::ClientError;
use crate::storage::TokenStore;
use fintrack_types::TokenResponse;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Side effect fired when the session is forcibly ended (refresh failed or the
/// refresh endpoint itself answered 401). Replaces a hard browser redirect.
pub trait SessionExpiredHandler: Send + Sync {
    fn session_expired(&self, login_route: &str);
}

impl<F> SessionExpiredHandler for F
where
    F: Fn(&str) + Send + Sync,
{
    fn session_expired(&self, login_route: &str) {
        self(login_route)
    }
}

/// Default handler: log the redirect target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl SessionExpiredHandler for LogRedirect {
    fn session_expired(&self, login_route: &str) {
        tracing::warn!("Session expired, redirecting to {}", login_route);
    }
}

/// Receives the `x-request-id` of every response.
pub type RequestIdObserver = Arc<dyn Fn(&str) + Send + Sync>;

/// HTTP client that attaches the bearer token and transparently refreshes it on 401.
pub struct AuthenticatedClient {
    http: Client,
    base_url: String,
    endpoints: AuthEndpoints,
    login_route: String,
    tokens: Arc<TokenStore>,
    default_headers: RwLock<HeaderMap>,
    refresh: RefreshCoordinator,
    on_expired: Arc<dyn SessionExpiredHandler>,
    request_id_observer: Option<RequestIdObserver>,
}

impl AuthenticatedClient {
    pub fn new(config: &ClientConfig, tokens: Arc<TokenStore>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.timeout()).cookie_store(true).build()?;
        Ok(Self::with_http_client(http, config, tokens))
    }

    /// Build around an existing `reqwest::Client` (shared connection pool, custom TLS).
    pub fn with_http_client(http: Client, config: &ClientConfig, tokens: Arc<TokenStore>) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(value) = tokens.get().as_deref().and_then(|t| bearer(t).ok()) {
            default_headers.insert(AUTHORIZATION, value);
        }
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
            login_route: config.login_route.clone(),
            tokens,
            default_headers: RwLock::new(default_headers),
            refresh: RefreshCoordinator::new(),
            on_expired: Arc::new(LogRedirect),
            request_id_observer: None,
        }
    }

    #[must_use]
    pub fn with_session_expired_handler(mut self, handler: Arc<dyn SessionExpiredHandler>) -> Self {
        self.on_expired = handler;
        self
    }

    #[must_use]
    pub fn with_request_id_observer(mut self, observer: RequestIdObserver) -> Self {
        self.request_id_observer = Some(observer);
        self
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn endpoints(&self) -> &AuthEndpoints {
        &self.endpoints
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Snapshot of the headers applied to every request.
    pub fn default_headers(&self) -> HeaderMap {
        self.default_headers.read().clone()
    }

    pub fn refresh_state(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        self.get(path).await?.json()
    }

    pub async fn post(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.request(ApiRequest::post(path)).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ClientError> {
        self.request(ApiRequest::post(path).json(body)?).await
    }

    pub async fn post_form<K, V>(
        &self,
        path: &str,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Result<ApiResponse, ClientError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.request(ApiRequest::post(path).form(fields)).await
    }

    /// Send a request, recovering from an expired access token at most once.
    pub async fn request(&self, req: ApiRequest) -> Result<ApiResponse, ClientError> {
        match self.send(&req, None).await {
            Err(err) if err.is_unauthorized() => self.handle_unauthorized(req, err).await,
            other => other,
        }
    }

    async fn handle_unauthorized(
        &self,
        mut req: ApiRequest,
        err: ClientError,
    ) -> Result<ApiResponse, ClientError> {
        if self.is_refresh_endpoint(req.path()) {
            tracing::warn!("Refresh endpoint rejected the refresh credential");
            self.expire_session();
            return Err(err);
        }
        if req.is_retried() || !req.is_refreshable() {
            return Err(err);
        }

        match self.refresh.join() {
            RefreshTicket::Waiter(rx) => {
                let token = wait_for_refresh(rx).await.map_err(ClientError::from)?;
                req.mark_retried();
                self.send(&req, Some(&token)).await
            }
            RefreshTicket::Leader(guard) => {
                req.mark_retried();
                tracing::debug!("Access token rejected for {}, refreshing", req.path());

                let outcome = self.call_refresh().await;
                if let Ok(token) = &outcome {
                    self.install_token(token);
                }
                guard.settle(&outcome);

                match outcome {
                    Ok(token) => self.send(&req, Some(&token)).await,
                    Err(failure) => {
                        tracing::warn!("Token refresh failed: {}", failure.message);
                        self.expire_session();
                        Err(failure.into())
                    }
                }
            }
        }
    }

    async fn call_refresh(&self) -> Result<String, RefreshFailure> {
        let req = ApiRequest::post(self.endpoints.refresh.as_str());
        let resp = self.send(&req, None).await.map_err(|e| RefreshFailure {
            status: e.status(),
            message: e.to_string(),
        })?;
        let token: TokenResponse = resp.json().map_err(|e| RefreshFailure {
            status: Some(resp.status().as_u16()),
            message: e.to_string(),
        })?;
        Ok(token.access_token)
    }

    /// Persist a token: memory, durable storage, and the default header.
    pub fn install_token(&self, token: &str) {
        self.tokens.set(token);
        match bearer(token) {
            Ok(value) => {
                self.default_headers.write().insert(AUTHORIZATION, value);
            }
            Err(e) => tracing::warn!("Access token is not a valid header value: {}", e),
        }
    }

    /// Forget the token everywhere without notifying anyone.
    pub fn clear_token(&self) {
        self.tokens.clear();
        self.default_headers.write().remove(AUTHORIZATION);
    }

    fn expire_session(&self) {
        self.clear_token();
        self.on_expired.session_expired(&self.login_route);
    }

    fn is_refresh_endpoint(&self, path: &str) -> bool {
        path.contains(self.endpoints.refresh.as_str())
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };
        Url::parse(&raw).map_err(|e| ClientError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// One round trip. `token` overrides the stored token (retries after refresh).
    async fn send(
        &self,
        req: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let mut headers = self.default_headers.read().clone();
        for (name, value) in req.headers() {
            headers.insert(name.clone(), value.clone());
        }
        let token = token.map(str::to_string).or_else(|| self.tokens.get());
        if let Some(value) = token.as_deref().and_then(|t| bearer(t).ok()) {
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = self.http.request(req.method().clone(), self.url(req.path())?);
        builder = match req.body() {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(fields) => builder.form(fields),
        };
        let resp = builder.headers(headers).send().await?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let correlation = request_id(&headers).map(str::to_string);
        if let (Some(observer), Some(id)) = (&self.request_id_observer, correlation.as_deref()) {
            observer(id);
        }
        let body = resp.bytes().await?;

        if !status.is_success() {
            tracing::debug!("{} {} -> {}", req.method(), req.path(), status);
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
                request_id: correlation,
            });
        }
        Ok(ApiResponse::new(status, headers, body))
    }
}

fn bearer(token: &str) -> Result<HeaderValue, reqwest::header::InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(tokens: Arc<TokenStore>) -> AuthenticatedClient {
        AuthenticatedClient::new(&ClientConfig::new("http://127.0.0.1:9/api/"), tokens).unwrap()
    }

    #[test]
    fn test_url_joins_base_and_path() {
        let client = client(Arc::new(TokenStore::in_memory()));
        assert_eq!(client.url("/auth/me").unwrap().as_str(), "http://127.0.0.1:9/api/auth/me");
        assert_eq!(
            client.url("https://other.example/x").unwrap().as_str(),
            "https://other.example/x"
        );
    }

    #[test]
    fn test_refresh_endpoint_detection() {
        let client = client(Arc::new(TokenStore::in_memory()));
        assert!(client.is_refresh_endpoint("/auth/refresh"));
        assert!(client.is_refresh_endpoint("/api/auth/refresh?x=1"));
        assert!(!client.is_refresh_endpoint("/auth/me"));
    }

    #[test]
    fn test_install_and_clear_token_update_default_header() {
        let tokens = Arc::new(TokenStore::in_memory());
        let client = client(tokens.clone());
        assert!(client.default_headers().get(AUTHORIZATION).is_none());

        client.install_token("tok1");
        assert_eq!(client.default_headers().get(AUTHORIZATION).unwrap(), "Bearer tok1");
        assert_eq!(tokens.get().as_deref(), Some("tok1"));

        client.clear_token();
        assert!(client.default_headers().get(AUTHORIZATION).is_none());
        assert!(!tokens.is_present());
    }

    #[test]
    fn test_persisted_token_seeds_default_header() {
        let tokens = Arc::new(TokenStore::new(Arc::new(
            crate::storage::MemoryTokenStorage::with_token("persisted"),
        )));
        let client = client(tokens);
        assert_eq!(client.default_headers().get(AUTHORIZATION).unwrap(), "Bearer persisted");
    }
}
