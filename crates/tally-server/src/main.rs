//! tally server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus `TALLY_*`
//! environment overrides, opens the SQLite visit log if one is configured,
//! and serves the site with visit tracking until SIGINT/SIGTERM.

use std::{
  net::SocketAddr,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use tally_server::{AppState, ServerConfig};
use tally_store_sqlite::SqliteStore;
use tokio::{
  net::TcpListener,
  signal::{
    ctrl_c,
    unix::{SignalKind, signal},
  },
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tally visit-tracking edge server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("TALLY"))
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.asset_dir = expand_tilde(&server_cfg.asset_dir);

  let store = match &server_cfg.store_path {
    Some(path) => {
      let path = expand_tilde(path);
      let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("failed to open store at {path:?}"))?;
      tracing::info!("Recording visits to {}", path.display());
      Some(Arc::new(store))
    }
    None => {
      tracing::warn!("no store_path configured; visits will not be recorded");
      None
    }
  };

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(store, server_cfg);
  let app = tally_server::router(state.clone());

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!(
    pending = state.recorder.in_flight(),
    "waiting for in-flight visit writes"
  );
  state.recorder.shutdown().await;
  tracing::info!("Server stopped");

  Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
  let interrupt = async {
    if let Err(e) = ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down");
  };

  let terminate = async {
    match signal(SignalKind::terminate()) {
      Ok(mut stream) => {
        stream.recv().await;
        tracing::info!("Received terminate signal, shutting down");
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  tokio::select! {
    _ = interrupt => {},
    _ = terminate => {},
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
