use clap::Parser;
use pmp_semantic_cache::cli::{self, Cli};
use pmp_semantic_cache::AppConfig;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    config.validate()?;

    // Blocking pool carries the store and snapshot file I/O
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.storage.threads)
        .build()?;

    runtime.block_on(cli::run(cli.command, config))
}
