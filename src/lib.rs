//! Offline-first versioned asset cache worker.
//!
//! Sits between a client application and its serving origin, deciding for
//! every request whether to serve from the local store, fetch fresh, or
//! reconcile the store against a new release. Upgrades are incremental: a
//! fingerprint diff against the previously activated manifest keeps
//! unchanged resources and evicts the rest, and any failure mid-upgrade
//! collapses into a full purge rather than an inconsistent cache.

pub mod config;
pub mod control;
pub mod lifecycle;
pub mod manifest;
pub mod net;
pub mod router;
pub mod store;
pub mod worker;

pub use config::Config;
pub use control::ControlCommand;
pub use lifecycle::{Activation, Clients, HostClients, LifecycleController};
pub use manifest::{ResourceManifest, ROOT_KEY};
pub use net::{CacheMode, Fetch, FetchRequest, HttpFetcher};
pub use router::{Method, Request, RequestRouter, RouteDecision};
pub use store::{AssetResponse, CacheStore, MemoryBackend, SqliteBackend, StoreBackend};
pub use worker::{Worker, WorkerPhase};
