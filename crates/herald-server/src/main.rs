//! Herald server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the
//! SQLite store, and either serves the JSON API or runs one retention sweep.
//!
//! ```text
//! herald serve
//! herald --config /etc/herald.toml purge
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use herald_core::store::NotificationStore as _;
use herald_server::ServerConfig;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Herald notification server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Default)]
enum Command {
  /// Serve the HTTP API (default).
  #[default]
  Serve,
  /// Delete notifications older than the purge window and exit.
  Purge,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;
  let store = herald_server::open_store(&cfg).await?;

  match cli.command.unwrap_or_default() {
    Command::Serve => serve(cfg, store).await,
    Command::Purge => purge(cfg, store).await,
  }
}

async fn serve(cfg: ServerConfig, store: herald_store_sqlite::SqliteStore) -> anyhow::Result<()> {
  let directory = herald_server::directory(&cfg);
  if cfg.users.is_empty() {
    tracing::warn!("no users configured; every create will be rejected");
  }

  let app = herald_server::app(Arc::new(store), Arc::new(directory));
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn purge(cfg: ServerConfig, store: herald_store_sqlite::SqliteStore) -> anyhow::Result<()> {
  let cutoff = cfg.retention.purge_cutoff(Utc::now());
  let removed = store
    .purge_created_before(cutoff)
    .await
    .context("purge failed")?;
  tracing::info!(removed, %cutoff, "retention sweep finished");
  Ok(())
}
