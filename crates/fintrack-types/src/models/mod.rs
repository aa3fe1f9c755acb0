//! Domain models for the FinTrack session client.
//!
//! Field names follow the backend's JSON so the structs can be (de)serialized directly.

mod log;
mod token;
mod user;

pub use log::{
    LogBatch, LogEntry, LogLevel, MAX_BATCH_ENTRIES, MAX_COMPONENT_CHARS, MAX_MESSAGE_CHARS,
    MAX_URL_CHARS, MAX_USER_AGENT_CHARS,
};
pub use token::{RegisterRequest, TokenResponse};
pub use user::{SessionDescriptor, SessionsResponse, User};
