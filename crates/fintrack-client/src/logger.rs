//! Tracing subscriber setup for binaries embedding the client.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a human-readable subscriber. `RUST_LOG` wins over `default_level`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed =
        tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(true)).try_init();
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// JSON output for production log shipping.
pub fn init_tracing_json(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if tracing_subscriber::registry().with(filter).with(fmt::layer().json()).try_init().is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
