//! Client configuration: API location, endpoint paths, and routes.
//!
//! Resolution order mirrors the rest of the workspace: explicit values, then
//! `FINTRACK_*` environment variables, then a JSON file, then defaults.

use fintrack_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Deployment environment; selects telemetry defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Read `FINTRACK_ENV` (`production`/`prod` selects production).
    pub fn from_env() -> Self {
        match std::env::var("FINTRACK_ENV").map(|v| v.to_ascii_lowercase()) {
            Ok(v) if v == "production" || v == "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Paths of the auth endpoints, relative to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthEndpoints {
    pub token: String,
    pub refresh: String,
    pub logout: String,
    pub logout_all: String,
    pub me: String,
    pub sessions: String,
    pub register: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            token: "/auth/token".to_string(),
            refresh: "/auth/refresh".to_string(),
            logout: "/auth/logout".to_string(),
            logout_all: "/auth/logout-all".to_string(),
            me: "/auth/me".to_string(),
            sessions: "/auth/sessions".to_string(),
            register: "/auth/register".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// File holding the access token; `None` keeps it in memory only.
    pub token_path: Option<PathBuf>,
    pub endpoints: AuthEndpoints,
    /// Where the session-expired handler sends the user.
    pub login_route: String,
    /// Where the guard sends users that lack a role.
    pub default_route: String,
    pub environment: Environment,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token_path: None,
            endpoints: AuthEndpoints::default(),
            login_route: "/login".to_string(),
            default_route: "/".to_string(),
            environment: Environment::Development,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Default::default() }
    }

    /// Defaults overridden by `FINTRACK_API_URL`, `FINTRACK_TIMEOUT_SECS`,
    /// `FINTRACK_TOKEN_PATH` and `FINTRACK_ENV`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound { path: path.display().to_string() });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError { message: e.to_string() })?;
        let mut config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;
        config.apply_env()?;
        config.validate()?;
        tracing::debug!("Loaded client config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("FINTRACK_API_URL") {
            self.base_url = url;
        }
        if let Ok(secs) = std::env::var("FINTRACK_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .parse()
                .map_err(|_| {
                    ConfigError::invalid("timeout_secs", format!("not a number: {secs}"))
                })?;
        }
        if let Ok(path) = std::env::var("FINTRACK_TOKEN_PATH") {
            self.token_path = Some(PathBuf::from(path));
        }
        if std::env::var("FINTRACK_ENV").is_ok() {
            self.environment = Environment::from_env();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid("base_url", e.to_string()))?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("timeout_secs", "must be greater than zero"));
        }
        if !self.login_route.starts_with('/') {
            return Err(ConfigError::invalid("login_route", "must be an absolute path"));
        }
        if !self.default_route.starts_with('/') {
            return Err(ConfigError::invalid("default_route", "must be an absolute path"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Token file under the user's data directory (`~/.local/share/fintrack/token`).
    pub fn default_token_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("fintrack").join("token"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        config.validate().unwrap();
        assert_eq!(config.endpoints.refresh, "/auth/refresh");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_url = ClientConfig::new("not a url");
        assert!(matches!(
            bad_url.validate(),
            Err(ConfigError::ValidationError { ref field, .. }) if field == "base_url"
        ));

        let zero_timeout = ClientConfig { timeout_secs: 0, ..Default::default() };
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(
            &path,
            r#"{"base_url":"https://api.example.com","endpoints":{"refresh":"/v2/auth/refresh"}}"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.endpoints.refresh, "/v2/auth/refresh");
        assert_eq!(config.endpoints.token, "/auth/token");
        assert_eq!(config.login_route, "/login");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ClientConfig::load(Path::new("/nonexistent/fintrack.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
