//! Request routing over the content store.
//!
//! The root document is served online-first so a released fix reaches
//! clients as soon as the network allows; every other manifest resource is
//! served cache-first and lazily populated on miss.

use color_eyre::Result;
use tracing::debug;
use url::Url;

use crate::manifest::{normalize_key, ResourceManifest, ROOT_KEY};
use crate::net::{Fetch, FetchRequest};
use crate::store::{AssetResponse, CacheStore, StoreBackend};

/// Request method, as far as the router cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Delete,
  Patch,
  Options,
}

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: String,
}

impl Request {
  /// A GET request for the given URL.
  pub fn get(url: impl Into<String>) -> Self {
    Self {
      method: Method::Get,
      url: url.into(),
    }
  }
}

/// What the worker decided to do with an intercepted request.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
  /// Not ours; yield to default network handling.
  PassThrough,
  /// Serve this response to the caller.
  Response(AssetResponse),
}

/// Routes intercepted requests against the manifest and the content store.
pub struct RequestRouter<B, F> {
  manifest: ResourceManifest,
  origin: Url,
  content: CacheStore<B>,
  fetcher: F,
}

impl<B: StoreBackend, F: Fetch> RequestRouter<B, F> {
  pub fn new(manifest: ResourceManifest, origin: Url, content: CacheStore<B>, fetcher: F) -> Self {
    Self {
      manifest,
      origin,
      content,
      fetcher,
    }
  }

  /// Classify a request and serve it under the matching policy.
  ///
  /// Write methods, foreign origins, and paths outside the manifest are
  /// never intercepted; the content store is not consulted for them.
  pub async fn route(&self, request: &Request) -> Result<RouteDecision> {
    if request.method != Method::Get {
      return Ok(RouteDecision::PassThrough);
    }

    let Some(key) = normalize_key(&request.url, &self.origin) else {
      return Ok(RouteDecision::PassThrough);
    };
    if !self.manifest.contains(&key) {
      return Ok(RouteDecision::PassThrough);
    }

    let response = if key == ROOT_KEY {
      self.online_first(&key).await?
    } else {
      self.cache_first(&key).await?
    };

    Ok(RouteDecision::Response(response))
  }

  /// Network when possible, cache as fallback. A network failure with no
  /// cached copy propagates to the caller; no silent empty response.
  async fn online_first(&self, key: &str) -> Result<AssetResponse> {
    match self.fetcher.fetch(FetchRequest::new(key)).await {
      Ok(response) => {
        self.content.put(key, &response)?;
        Ok(response)
      }
      Err(err) => match self.content.match_key(key)? {
        Some(cached) => {
          debug!(key = %key, "network failed, serving cached root document");
          Ok(cached)
        }
        None => Err(err),
      },
    }
  }

  /// Cache when possible, network as fallback. Only responses with a
  /// successful status are written back, so error pages never poison the
  /// cache; the response goes to the caller either way.
  async fn cache_first(&self, key: &str) -> Result<AssetResponse> {
    if let Some(cached) = self.content.match_key(key)? {
      return Ok(cached);
    }

    let response = self.fetcher.fetch(FetchRequest::new(key)).await?;
    if response.ok() {
      self.content.put(key, &response)?;
    }
    Ok(response)
  }
}
