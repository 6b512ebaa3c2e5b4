//! `xtchd`: command-line front end for the xtchd archive.
//!
//! # Usage
//!
//! ```
//! xtchd --store archive.sqlite author "Jane Doe"
//! xtchd article --author 0 "A headline"
//! xtchd show article 0
//! xtchd verify
//! ```
//!
//! Every command prints its result as pretty JSON on stdout. Logs go to
//! stderr and follow `RUST_LOG`.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use commands::Command;
use config::CliConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use xtchd_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Tamper-evident journalism archive")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "xtchd.toml")]
  config: PathBuf,

  /// SQLite database path; overrides `store_path` from the config.
  #[arg(long, value_name = "PATH")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config, cli.store)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {}", cfg.store_path.display()))?;

  commands::run(&store, cli.command).await
}
