//! Logging and tracing initialization.
//!
//! The level is controlled by `RUST_LOG` and defaults to `info`:
//!
//! ```bash
//! RUST_LOG=stockroom_core=debug,tower_http=debug,sqlx=warn stockroom serve
//! ```
//!
//! Gate denials are logged at `debug`, so `stockroom_core::auth=debug` shows
//! why a request got a 401 or 403.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber in the requested format.
///
/// # Panics
///
/// Panics if a global subscriber is already installed. Call it once at
/// startup; tests should use [`try_init_logging`].
pub fn init_logging(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(env_filter("info"));
    match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_line_number(true)
                    .with_target(true),
            )
            .init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init(),
    }
}

/// Like [`init_logging`] with compact output, but a no-op if a subscriber is
/// already set.
pub fn try_init_logging(default_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(tracing_subscriber::fmt::layer().compact().with_test_writer())
        .try_init();
}
