//! Tracing initialization.

use std::io;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogConfig, LogFormat};

/// Initializes the tracing subscriber writing to stderr.
///
/// The filter is read from `RUST_LOG` and defaults to `info`:
///
/// ```bash
/// RUST_LOG=debug ragqa push 1
/// RUST_LOG=ragqa_vector=trace,ragqa_rig=debug ragqa answer 1 "..."
/// ```
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    let env_filter = create_env_filter()?;
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}

fn create_env_filter() -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new("info")?),
    }
}
