//! Logging setup, powered by tracing-subscriber
//!
//! Library code only emits `tracing` events; the binary calls [`init`] once to
//! install a stderr subscriber.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable that overrides the configured filter
pub const LOG_ENV: &str = "SQLPLAY_LOG";

/// Build the filter: `SQLPLAY_LOG` when set, else `default_filter`
fn build_env_filter(default_filter: &str) -> anyhow::Result<EnvFilter> {
    let directives = std::env::var(LOG_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_filter.to_string());

    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", directives, e))
}

/// Install the global subscriber writing compact lines to stderr
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time()
        .with_filter(build_env_filter(default_filter)?);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;

    tracing::trace!(filter = %default_filter, "logging initialized");
    Ok(())
}
