//! Store contract shared by all cache backends.

use std::sync::Arc;

use color_eyre::Result;

/// Name of the transient store that holds freshly fetched shell resources
/// between install and activation.
pub const STAGING_STORE: &str = "staging";

/// Name of the long-lived store the request router serves from.
pub const CONTENT_STORE: &str = "content";

/// Name of the store holding the persisted manifest snapshot.
pub const MANIFEST_STORE: &str = "manifest";

/// A stored response payload with enough metadata to replay it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
  /// HTTP status code the resource was fetched with.
  pub status: u16,
  /// Content-Type header, when the origin supplied one.
  pub content_type: Option<String>,
  /// Response body bytes.
  pub body: Vec<u8>,
}

impl AssetResponse {
  /// Create a response payload.
  pub fn new(status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
    Self {
      status,
      content_type,
      body,
    }
  }

  /// Whether the response carries a successful status.
  pub fn ok(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Trait for durable backends that hold multiple named key-to-response stores.
///
/// Every operation is atomic at single-key granularity. `keys` on a store
/// that was deleted (or never written) yields an empty sequence.
pub trait StoreBackend: Send + Sync {
  /// Insert or replace an entry in the named store.
  fn put(&self, store: &str, key: &str, response: &AssetResponse) -> Result<()>;

  /// Look up an entry in the named store.
  fn match_key(&self, store: &str, key: &str) -> Result<Option<AssetResponse>>;

  /// Remove a single entry from the named store.
  fn delete(&self, store: &str, key: &str) -> Result<()>;

  /// List all keys currently present in the named store.
  fn keys(&self, store: &str) -> Result<Vec<String>>;

  /// Remove the entire named store.
  fn delete_store(&self, store: &str) -> Result<()>;
}

/// Handle binding a backend to one named store.
///
/// The lifecycle controller and the request router receive these handles
/// explicitly instead of opening stores by name themselves.
pub struct CacheStore<B> {
  backend: Arc<B>,
  name: &'static str,
}

impl<B> Clone for CacheStore<B> {
  fn clone(&self) -> Self {
    Self {
      backend: Arc::clone(&self.backend),
      name: self.name,
    }
  }
}

impl<B: StoreBackend> CacheStore<B> {
  /// Bind a backend to a named store.
  pub fn new(backend: Arc<B>, name: &'static str) -> Self {
    Self { backend, name }
  }

  /// Name of the underlying store.
  pub fn name(&self) -> &'static str {
    self.name
  }

  /// Insert or replace an entry.
  pub fn put(&self, key: &str, response: &AssetResponse) -> Result<()> {
    self.backend.put(self.name, key, response)
  }

  /// Look up an entry.
  pub fn match_key(&self, key: &str) -> Result<Option<AssetResponse>> {
    self.backend.match_key(self.name, key)
  }

  /// Remove a single entry.
  pub fn delete(&self, key: &str) -> Result<()> {
    self.backend.delete(self.name, key)
  }

  /// List all keys in the store.
  pub fn keys(&self) -> Result<Vec<String>> {
    self.backend.keys(self.name)
  }

  /// Remove the entire store.
  pub fn delete_all(&self) -> Result<()> {
    self.backend.delete_store(self.name)
  }
}
