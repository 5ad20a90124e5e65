//! Install and activation lifecycle for the cache worker.
//!
//! Install warms the staging store with force-reloaded shell resources.
//! Activation diffs the content store against the previously persisted
//! manifest snapshot, migrates staged entries over it, and publishes the
//! new snapshot. Any failure inside the migration collapses into a full
//! purge of all three stores so the next activation starts from a clean
//! first-run state instead of an inconsistent half-migrated cache.

use color_eyre::{eyre::eyre, Result};
use tracing::{debug, error, info};

use crate::manifest::ResourceManifest;
use crate::net::{Fetch, FetchRequest};
use crate::store::{AssetResponse, CacheStore, StoreBackend};

/// Fixed key the manifest snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "manifest";

/// Outcome of a successful activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
  /// No prior snapshot existed; the content store was rebuilt from staging.
  FirstRun,
  /// A snapshot existed; unchanged entries were retained, the rest migrated.
  Upgraded,
  /// The migration failed and every store was purged.
  Recovered,
}

/// Access to the clients this worker takes over once active.
pub trait Clients: Send + Sync {
  /// Route future requests from already-open clients through this worker.
  fn claim(&self);
}

/// Production client handle: the takeover is between the worker and its
/// host, so there is nothing to do here beyond recording it.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostClients;

impl Clients for HostClients {
  fn claim(&self) {
    info!("claiming open clients");
  }
}

/// Orchestrates install, activation, and failure recovery.
///
/// Exclusively owns writes to all three stores; the router only ever
/// writes to content as a side effect of serving.
pub struct LifecycleController<B, F, C> {
  manifest: ResourceManifest,
  shell: Vec<String>,
  staging: CacheStore<B>,
  content: CacheStore<B>,
  snapshots: CacheStore<B>,
  fetcher: F,
  clients: C,
}

impl<B: StoreBackend, F: Fetch, C: Clients> LifecycleController<B, F, C> {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    manifest: ResourceManifest,
    shell: Vec<String>,
    staging: CacheStore<B>,
    content: CacheStore<B>,
    snapshots: CacheStore<B>,
    fetcher: F,
    clients: C,
  ) -> Self {
    Self {
      manifest,
      shell,
      staging,
      content,
      snapshots,
      fetcher,
      clients,
    }
  }

  /// Warm the staging store with every shell resource.
  ///
  /// Shell fetches bypass intermediary caches. A single failure aborts the
  /// install and propagates to the host; the worker must not become active.
  pub async fn install(&self) -> Result<()> {
    for key in &self.shell {
      let response = self
        .fetcher
        .fetch(FetchRequest::reload(key.clone()))
        .await
        .map_err(|e| eyre!("Failed to fetch shell resource {}: {}", key, e))?;
      self.staging.put(key, &response)?;
    }

    debug!(resources = self.shell.len(), "staged shell resources");
    Ok(())
  }

  /// Promote this worker's cache to serve traffic.
  ///
  /// The migration body is fallible; any error inside it is converted into
  /// an unconditional purge of content, staging, and manifest stores.
  pub async fn activate(&self) -> Result<Activation> {
    match self.migrate().await {
      Ok(outcome) => {
        info!(?outcome, "cache activation complete");
        Ok(outcome)
      }
      Err(err) => {
        error!(error = %err, "Failed to upgrade cache, purging all stores");
        self.content.delete_all()?;
        self.staging.delete_all()?;
        self.snapshots.delete_all()?;
        Ok(Activation::Recovered)
      }
    }
  }

  async fn migrate(&self) -> Result<Activation> {
    let Some(previous) = self.load_snapshot()? else {
      // No prior manifest: clear whatever is in the content store and
      // rebuild it from staging alone.
      self.content.delete_all()?;
      self.copy_staging_into_content()?;
      self.publish_snapshot()?;
      self.staging.delete_all()?;
      self.clients.claim();
      return Ok(Activation::FirstRun);
    };

    // Evict entries that are gone from the new manifest or whose
    // fingerprint changed since the snapshot. What survives is exactly the
    // set of resources unchanged between versions.
    for key in self.content.keys()? {
      let current = self.manifest.fingerprint(&key);
      if current.is_none() || current != previous.fingerprint(&key) {
        debug!(key = %key, "evicting stale resource");
        self.content.delete(&key)?;
      }
    }

    // Shell freshness wins over anything retained above.
    self.copy_staging_into_content()?;
    self.publish_snapshot()?;
    self.staging.delete_all()?;
    self.clients.claim();
    Ok(Activation::Upgraded)
  }

  fn copy_staging_into_content(&self) -> Result<()> {
    for key in self.staging.keys()? {
      if let Some(response) = self.staging.match_key(&key)? {
        self.content.put(&key, &response)?;
      }
    }
    Ok(())
  }

  fn load_snapshot(&self) -> Result<Option<ResourceManifest>> {
    match self.snapshots.match_key(SNAPSHOT_KEY)? {
      Some(entry) => Ok(Some(ResourceManifest::from_json(&entry.body)?)),
      None => Ok(None),
    }
  }

  fn publish_snapshot(&self) -> Result<()> {
    let body = self.manifest.to_json()?;
    let entry = AssetResponse::new(200, Some("application/json".to_string()), body);
    self.snapshots.put(SNAPSHOT_KEY, &entry)
  }
}
