//! Log subscriber for the quill binary.
//!
//! The filter comes from `RUST_LOG` when it is set and parses, otherwise
//! from the configured `LOG_LEVEL`. `LOG_JSON` switches the line format.

use crate::config::Config;
use crate::error::{QuillError, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Parse filter directives such as `info` or `quill=debug,warn`.
///
/// # Errors
///
/// Returns `QuillError::Config` if a directive does not parse.
pub fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| QuillError::config(format!("Invalid log filter {directives:?}: {e}")))
}

/// Install the global subscriber for `config`.
///
/// # Errors
///
/// Returns `QuillError::Config` if the configured level does not parse or a
/// global subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = select_filter(&config.log_level, from_env.as_deref())?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    installed.map_err(|e| QuillError::config(format!("Tracing already initialized: {e}")))
}

fn select_filter(configured: &str, from_env: Option<&str>) -> Result<EnvFilter> {
    match from_env.map(parse_filter) {
        Some(Ok(filter)) => Ok(filter),
        _ => parse_filter(configured),
    }
}
