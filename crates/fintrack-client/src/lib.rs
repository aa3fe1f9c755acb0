//! Session core for the FinTrack client.
//!
//! - [`http::AuthenticatedClient`]: bearer-token HTTP client with single-flight
//!   token refresh and a queue for requests that hit 401 mid-refresh
//! - [`session::SessionStore`]: token, user, and session-list state
//! - [`telemetry::Telemetry`]: leveled client logs batched to the backend
//! - [`guard::NavigationGuard`]: route authorization decisions

pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod logger;
pub mod session;
pub mod storage;
pub mod telemetry;

pub use config::{AuthEndpoints, ClientConfig, Environment};
pub use error::{ClientError, ErrorCategory};
pub use guard::{GuardDecision, NavigationGuard, RouteMeta, RouteTable};
pub use http::{ApiRequest, ApiResponse, AuthenticatedClient, SessionExpiredHandler};
pub use session::{SessionLifecycle, SessionStore};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage, TokenStore};
pub use telemetry::{ConsoleSink, Telemetry, TelemetryConfig, TracingConsole};
