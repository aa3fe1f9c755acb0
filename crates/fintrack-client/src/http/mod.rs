//! Authenticated HTTP client.
//!
//! - [`AuthenticatedClient`] attaches the bearer token and recovers from 401s
//! - [`RefreshCoordinator`] guarantees a single in-flight refresh call
//! - [`ApiRequest`] / [`ApiResponse`] are owned values so requests can be replayed

mod client;
mod refresh;
mod request;

pub use client::{AuthenticatedClient, LogRedirect, RequestIdObserver, SessionExpiredHandler};
pub use refresh::{RefreshCoordinator, RefreshFailure, RefreshOutcome};
pub use request::{ApiRequest, ApiResponse, RequestBody, REQUEST_ID_HEADER};
