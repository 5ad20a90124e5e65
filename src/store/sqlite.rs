//! SQLite-backed durable store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};

use super::traits::{AssetResponse, StoreBackend};

/// Durable store backend keeping all named stores in one SQLite database.
pub struct SqliteBackend {
  conn: Mutex<Connection>,
}

impl SqliteBackend {
  /// Open (or create) the database at the given path.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let backend = Self {
      conn: Mutex::new(conn),
    };
    backend.run_migrations()?;

    Ok(backend)
  }

  /// Open a transient in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    let backend = Self {
      conn: Mutex::new(conn),
    };
    backend.run_migrations()?;

    Ok(backend)
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run store migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the cache entry table. All named stores share it, keyed by
/// the store column.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    store TEXT NOT NULL,
    request_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (store, request_key)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_store ON cache_entries(store);
"#;

impl StoreBackend for SqliteBackend {
  fn put(&self, store: &str, key: &str, response: &AssetResponse) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries (store, request_key, status, content_type, body, cached_at)
         VALUES (?, ?, ?, ?, ?, datetime('now'))",
        params![store, key, response.status, response.content_type, response.body],
      )
      .map_err(|e| eyre!("Failed to store entry {}: {}", key, e))?;

    Ok(())
  }

  fn match_key(&self, store: &str, key: &str) -> Result<Option<AssetResponse>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare(
        "SELECT status, content_type, body FROM cache_entries
         WHERE store = ? AND request_key = ?",
      )
      .map_err(|e| eyre!("Failed to prepare lookup: {}", e))?;

    let row: Option<(u16, Option<String>, Vec<u8>)> = stmt
      .query_row(params![store, key], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
      })
      .ok();

    Ok(row.map(|(status, content_type, body)| AssetResponse::new(status, content_type, body)))
  }

  fn delete(&self, store: &str, key: &str) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute(
        "DELETE FROM cache_entries WHERE store = ? AND request_key = ?",
        params![store, key],
      )
      .map_err(|e| eyre!("Failed to delete entry {}: {}", key, e))?;

    Ok(())
  }

  fn keys(&self, store: &str) -> Result<Vec<String>> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare("SELECT request_key FROM cache_entries WHERE store = ? ORDER BY request_key")
      .map_err(|e| eyre!("Failed to prepare key listing: {}", e))?;

    let keys: Vec<String> = stmt
      .query_map(params![store], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list keys: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(keys)
  }

  fn delete_store(&self, store: &str) -> Result<()> {
    let conn = self.lock()?;

    conn
      .execute("DELETE FROM cache_entries WHERE store = ?", params![store])
      .map_err(|e| eyre!("Failed to delete store {}: {}", store, e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(body: &str) -> AssetResponse {
    AssetResponse::new(200, Some("text/html".to_string()), body.as_bytes().to_vec())
  }

  #[test]
  fn test_round_trip() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    backend.put("content", "index.html", &response("<html>")).unwrap();

    let found = backend.match_key("content", "index.html").unwrap();
    assert_eq!(found, Some(response("<html>")));
    assert_eq!(backend.match_key("content", "other").unwrap(), None);
  }

  #[test]
  fn test_put_replaces_existing_entry() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    backend.put("content", "app.js", &response("v1")).unwrap();
    backend.put("content", "app.js", &response("v2")).unwrap();

    let found = backend.match_key("content", "app.js").unwrap().unwrap();
    assert_eq!(found.body, b"v2");
    assert_eq!(backend.keys("content").unwrap().len(), 1);
  }

  #[test]
  fn test_keys_scoped_to_store() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    backend.put("staging", "a", &response("a")).unwrap();
    backend.put("content", "b", &response("b")).unwrap();

    assert_eq!(backend.keys("staging").unwrap(), vec!["a".to_string()]);
    assert_eq!(backend.keys("content").unwrap(), vec!["b".to_string()]);
  }

  #[test]
  fn test_delete_store_leaves_others_intact() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    backend.put("staging", "a", &response("a")).unwrap();
    backend.put("content", "b", &response("b")).unwrap();
    backend.delete_store("staging").unwrap();

    assert_eq!(backend.keys("staging").unwrap(), Vec::<String>::new());
    assert_eq!(backend.keys("content").unwrap(), vec!["b".to_string()]);
  }

  #[test]
  fn test_persists_across_reopen() {
    let path = std::env::temp_dir().join(format!("offcache-test-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    {
      let backend = SqliteBackend::open_at(&path).unwrap();
      backend.put("content", "index.html", &response("<html>")).unwrap();
    }

    let reopened = SqliteBackend::open_at(&path).unwrap();
    let found = reopened.match_key("content", "index.html").unwrap();
    assert_eq!(found, Some(response("<html>")));

    let _ = std::fs::remove_file(&path);
  }

  #[test]
  fn test_preserves_missing_content_type() {
    let backend = SqliteBackend::open_in_memory().unwrap();
    let payload = AssetResponse::new(200, None, b"bytes".to_vec());
    backend.put("content", "raw", &payload).unwrap();

    assert_eq!(backend.match_key("content", "raw").unwrap(), Some(payload));
  }
}
