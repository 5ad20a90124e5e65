//! In-memory store backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use color_eyre::{eyre::eyre, Result};

use super::traits::{AssetResponse, StoreBackend};

/// Store backend keeping everything in process memory.
///
/// Used for ephemeral runs and tests; the durable equivalent is
/// [`super::SqliteBackend`].
#[derive(Default)]
pub struct MemoryBackend {
  stores: Mutex<HashMap<String, BTreeMap<String, AssetResponse>>>,
}

impl MemoryBackend {
  /// Create an empty backend.
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, BTreeMap<String, AssetResponse>>>> {
    self.stores.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl StoreBackend for MemoryBackend {
  fn put(&self, store: &str, key: &str, response: &AssetResponse) -> Result<()> {
    let mut stores = self.lock()?;
    stores
      .entry(store.to_string())
      .or_default()
      .insert(key.to_string(), response.clone());
    Ok(())
  }

  fn match_key(&self, store: &str, key: &str) -> Result<Option<AssetResponse>> {
    let stores = self.lock()?;
    Ok(stores.get(store).and_then(|entries| entries.get(key)).cloned())
  }

  fn delete(&self, store: &str, key: &str) -> Result<()> {
    let mut stores = self.lock()?;
    if let Some(entries) = stores.get_mut(store) {
      entries.remove(key);
    }
    Ok(())
  }

  fn keys(&self, store: &str) -> Result<Vec<String>> {
    let stores = self.lock()?;
    Ok(
      stores
        .get(store)
        .map(|entries| entries.keys().cloned().collect())
        .unwrap_or_default(),
    )
  }

  fn delete_store(&self, store: &str) -> Result<()> {
    let mut stores = self.lock()?;
    stores.remove(store);
    Ok(())
  }
}
