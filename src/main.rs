use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use offcache::{Config, ControlCommand, HostClients, HttpFetcher, StoreBackend, Worker};

#[derive(Parser, Debug)]
#[command(name = "offcache")]
#[command(about = "An offline-first versioned asset cache worker")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/offcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Keep the cache in memory instead of the durable store
  #[arg(long)]
  ephemeral: bool,

  /// After activation, prefetch every manifest resource for full offline use
  #[arg(long)]
  offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_env("OFFCACHE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  if args.ephemeral {
    let backend = Arc::new(offcache::MemoryBackend::new());
    warm(backend, &config, args.offline).await
  } else {
    let backend = Arc::new(offcache::SqliteBackend::open_at(&config.db_path()?)?);
    warm(backend, &config, args.offline).await
  }
}

/// Run the worker through install and activation, optionally prefetching
/// the whole manifest for offline use.
async fn warm<B: StoreBackend>(backend: Arc<B>, config: &Config, offline: bool) -> Result<()> {
  let origin = config.origin_url()?;
  let fetcher = HttpFetcher::new(origin.clone())?;

  let mut worker = Worker::new(
    config.manifest(),
    config.shell.clone(),
    origin,
    backend,
    fetcher,
    HostClients,
  );

  worker.handle_install().await?;
  let outcome = worker.handle_activate().await?;
  info!(?outcome, "worker active");

  if offline {
    worker
      .handle_message(ControlCommand::SyncOffline.as_str())
      .await?;
  }

  println!(
    "{} of {} manifest resources cached",
    worker.cached_resources()?,
    config.manifest().len()
  );

  Ok(())
}
