//! Stats command - prints statistics for the persisted cache

use crate::api::types::StatsData;
use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    init_logging(&config.logging);

    let state = crate::create_app_state(&config).await?;
    let stats = StatsData::from(state.cache.stats().await?);

    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
