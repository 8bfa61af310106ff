//! CLI module for the semantic cache
//!
//! - `serve`: HTTP server (default)
//! - `refresh`: snapshot and clear the persisted cache, then exit
//! - `stats`: print cache statistics as JSON

pub mod refresh;
pub mod serve;
pub mod stats;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

/// PMP Semantic Cache - answers near-duplicate queries from a vector store
#[derive(Parser)]
#[command(name = "pmp-semantic-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Snapshot the persisted records, then clear them
    Refresh,

    /// Print cache statistics
    Stats,
}

/// Dispatch a command; no subcommand means `serve`
pub async fn run(command: Option<Command>, config: AppConfig) -> anyhow::Result<()> {
    match command.unwrap_or(Command::Serve) {
        Command::Serve => serve::run(config).await,
        Command::Refresh => refresh::run(config).await,
        Command::Stats => stats::run(config).await,
    }
}
