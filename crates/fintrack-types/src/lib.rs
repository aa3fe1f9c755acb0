//! # FinTrack Types
//!
//! Wire types, models, and error definitions shared by the FinTrack session client.
//!
//! - **`error`** - Typed error hierarchy for authentication, telemetry, and configuration
//! - **`models`** - Domain models (User, SessionDescriptor, TokenResponse, LogEntry)
//!
//! ## Architecture Role
//!
//! `fintrack-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!        fintrack-types (this crate)
//!                │
//!                ▼
//!        fintrack-client
//!                │
//!                ▼
//!          fintrack-cli
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde, matching the backend's JSON field names
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

pub use error::{AuthError, ConfigError, TelemetryError, TypedError};

pub use models::{
    LogBatch, LogEntry, LogLevel, RegisterRequest, SessionDescriptor, SessionsResponse,
    TokenResponse, User,
};
