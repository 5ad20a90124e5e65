//! Host event dispatch: install, activate, fetch, message.
//!
//! The host delivers lifecycle events in order (install, then activate,
//! then fetches); the worker tracks its phase as its side of that
//! contract and refuses to intercept traffic before it is active.

use std::sync::Arc;

use color_eyre::Result;
use tracing::{debug, info, warn};
use url::Url;

use crate::control::{self, ControlCommand};
use crate::lifecycle::{Activation, Clients, LifecycleController};
use crate::manifest::ResourceManifest;
use crate::net::Fetch;
use crate::router::{Request, RequestRouter, RouteDecision};
use crate::store::{CacheStore, StoreBackend, CONTENT_STORE, MANIFEST_STORE, STAGING_STORE};

/// Where the worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
  /// Created, shell not yet staged.
  New,
  /// Shell staged, waiting to be promoted.
  Installed,
  /// Serving traffic.
  Active,
}

/// A cache worker wired to one deployed version.
pub struct Worker<B, F, C> {
  controller: LifecycleController<B, F, C>,
  router: RequestRouter<B, F>,
  manifest: ResourceManifest,
  content: CacheStore<B>,
  fetcher: F,
  phase: WorkerPhase,
}

impl<B: StoreBackend, F: Fetch + Clone, C: Clients> Worker<B, F, C> {
  /// Wire a worker to its stores, fetcher, and client handle.
  pub fn new(
    manifest: ResourceManifest,
    shell: Vec<String>,
    origin: Url,
    backend: Arc<B>,
    fetcher: F,
    clients: C,
  ) -> Self {
    let staging = CacheStore::new(Arc::clone(&backend), STAGING_STORE);
    let content = CacheStore::new(Arc::clone(&backend), CONTENT_STORE);
    let snapshots = CacheStore::new(backend, MANIFEST_STORE);

    let controller = LifecycleController::new(
      manifest.clone(),
      shell,
      staging,
      content.clone(),
      snapshots,
      fetcher.clone(),
      clients,
    );
    let router = RequestRouter::new(manifest.clone(), origin, content.clone(), fetcher.clone());

    Self {
      controller,
      router,
      manifest,
      content,
      fetcher,
      phase: WorkerPhase::New,
    }
  }

  /// Current lifecycle phase.
  pub fn phase(&self) -> WorkerPhase {
    self.phase
  }

  /// Install event: stage the shell. On failure the worker stays `New`.
  pub async fn handle_install(&mut self) -> Result<()> {
    self.controller.install().await?;
    self.phase = WorkerPhase::Installed;
    Ok(())
  }

  /// Activate event: migrate the cache and start serving.
  pub async fn handle_activate(&mut self) -> Result<Activation> {
    let outcome = self.controller.activate().await?;
    self.phase = WorkerPhase::Active;
    Ok(outcome)
  }

  /// Fetch event: route the request, or yield it back to the host when the
  /// worker is not serving yet.
  pub async fn handle_fetch(&self, request: &Request) -> Result<RouteDecision> {
    if self.phase != WorkerPhase::Active {
      debug!(phase = ?self.phase, "not active, yielding fetch to default handling");
      return Ok(RouteDecision::PassThrough);
    }
    self.router.route(request).await
  }

  /// Message event: dispatch a control command.
  pub async fn handle_message(&mut self, data: &str) -> Result<()> {
    match ControlCommand::parse(data) {
      Some(ControlCommand::PromoteNow) => match self.phase {
        WorkerPhase::Installed => {
          info!("promoting waiting worker");
          self.handle_activate().await?;
        }
        WorkerPhase::New => {
          warn!("cannot promote a worker that has not installed");
        }
        WorkerPhase::Active => {}
      },
      Some(ControlCommand::SyncOffline) => {
        control::sync_offline(&self.manifest, &self.content, &self.fetcher).await?;
      }
      None => {
        warn!(data = %data, "ignoring unknown control message");
      }
    }
    Ok(())
  }

  /// Number of resources currently held by the content store.
  pub fn cached_resources(&self) -> Result<usize> {
    Ok(self.content.keys()?.len())
  }
}
