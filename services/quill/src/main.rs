//! Quill store bootstrap: loads configuration, opens the snapshot file and
//! reports what it holds.

use anyhow::Context;
use quill::observability::init_tracing;
use quill::{Config, SessionService};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config).context("Failed to install tracing subscriber")?;

    info!(log_json = config.log_json, "Starting Quill");

    let service = SessionService::from_config(&config).with_context(|| {
        format!("Failed to open store at {}", config.database_path.display())
    })?;
    let stats = service.store().stats().context("Failed to read store snapshot")?;

    info!(
        path = %config.database_path.display(),
        posts = stats.posts,
        accounts = stats.accounts,
        revocations = stats.revocations,
        "Store ready"
    );

    Ok(())
}
