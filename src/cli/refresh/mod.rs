//! Refresh command - one-shot rotation of the persisted cache
//!
//! Operates on the store files directly; run it only while no server has
//! the same data directory open.

use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    init_logging(&config.logging);

    let state = crate::create_app_state(&config).await?;
    let report = state.refresh.refresh().await?;

    info!(
        exported = report.exported,
        path = %report.snapshot_path.display(),
        "Refresh complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
