//! Out-of-band control commands delivered to the running worker.

use std::collections::HashSet;

use color_eyre::Result;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::manifest::ResourceManifest;
use crate::net::{Fetch, FetchRequest};
use crate::store::{CacheStore, StoreBackend};

/// Commands the worker accepts on its message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
  /// Skip the waiting period and become the active worker immediately.
  PromoteNow,
  /// Prefetch every manifest resource missing from the content store.
  SyncOffline,
}

impl ControlCommand {
  /// Parse a wire message. Unknown messages are not commands.
  pub fn parse(data: &str) -> Option<Self> {
    match data {
      "promote-now" => Some(Self::PromoteNow),
      "sync-offline" => Some(Self::SyncOffline),
      _ => None,
    }
  }

  /// The wire form of this command.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::PromoteNow => "promote-now",
      Self::SyncOffline => "sync-offline",
    }
  }
}

/// Fill the content store with every manifest resource it is missing.
///
/// Guarantees full offline availability beyond the lazily populated
/// cache-first default. The fill is best-effort: an individual fetch
/// failure is logged and skipped, partial progress is kept. Returns the
/// number of resources added.
pub async fn sync_offline<B: StoreBackend, F: Fetch>(
  manifest: &ResourceManifest,
  content: &CacheStore<B>,
  fetcher: &F,
) -> Result<usize> {
  let cached: HashSet<String> = content.keys()?.into_iter().collect();
  let missing: Vec<&str> = manifest.keys().filter(|k| !cached.contains(*k)).collect();

  if missing.is_empty() {
    debug!("content store already holds every manifest resource");
    return Ok(0);
  }

  let fetches = missing
    .iter()
    .map(|key| fetcher.fetch(FetchRequest::new(*key)));
  let results = join_all(fetches).await;

  let mut filled = 0;
  for (key, result) in missing.iter().zip(results) {
    match result {
      Ok(response) if response.ok() => {
        content.put(key, &response)?;
        filled += 1;
      }
      Ok(response) => {
        warn!(key = %key, status = response.status, "not caching failing response during offline sync");
      }
      Err(err) => {
        warn!(key = %key, error = %err, "Failed to fetch resource during offline sync");
      }
    }
  }

  info!(filled, missing = missing.len(), "offline sync complete");
  Ok(filled)
}
