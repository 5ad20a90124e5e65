//! Network contract consumed by the lifecycle controller and router.

use std::future::Future;

use color_eyre::{eyre::eyre, Result};
use url::Url;

use crate::manifest::ROOT_KEY;
use crate::store::AssetResponse;

/// Cache semantics to request from intermediaries when fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
  /// Normal fetch.
  Default,
  /// Bypass any cached copy between the worker and the origin.
  Reload,
}

/// A single resource fetch, addressed by manifest key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
  pub key: String,
  pub mode: CacheMode,
}

impl FetchRequest {
  /// Fetch with default cache semantics.
  pub fn new(key: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      mode: CacheMode::Default,
    }
  }

  /// Fetch with force-reload semantics.
  pub fn reload(key: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      mode: CacheMode::Reload,
    }
  }
}

/// Asynchronous fetch of a resource from the serving origin.
///
/// An `Err` is a network failure (rejected or timed out). A response with a
/// failing status is a normal `Ok`; callers decide what to do with it.
pub trait Fetch: Send + Sync {
  fn fetch(&self, request: FetchRequest) -> impl Future<Output = Result<AssetResponse>> + Send;
}

/// HTTP fetcher resolving manifest keys against the serving origin.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  origin: Url,
}

impl HttpFetcher {
  pub fn new(origin: Url) -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }
}

impl Fetch for HttpFetcher {
  async fn fetch(&self, request: FetchRequest) -> Result<AssetResponse> {
    let url = if request.key == ROOT_KEY {
      self.origin.clone()
    } else {
      self
        .origin
        .join(&request.key)
        .map_err(|e| eyre!("Failed to resolve {} against origin: {}", request.key, e))?
    };

    let mut builder = self.client.get(url);
    if request.mode == CacheMode::Reload {
      builder = builder.header(reqwest::header::CACHE_CONTROL, "no-cache");
    }

    let response = builder
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", request.key, e))?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", request.key, e))?
      .to_vec();

    Ok(AssetResponse::new(status, content_type, body))
  }
}
