//! Named, durable key-to-response stores.
//!
//! The worker keeps three of them: a transient *staging* store warmed during
//! install, the long-lived *content* store the router serves from, and a
//! *manifest* store holding the snapshot of the last activated manifest.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::{
  AssetResponse, CacheStore, StoreBackend, CONTENT_STORE, MANIFEST_STORE, STAGING_STORE,
};
