//! Metadata cache and consistency engine for the Sensos observation
//! service.
//!
//! The service must answer metadata questions — what time range, what
//! spatial extent, which offerings/procedures/features exist — without
//! scanning the observation store on every request. This crate keeps the
//! pre-aggregated answers synchronized with the store as observations are
//! inserted and deleted.
//!
//! ```text
//! mutation path                 consistency engine            store
//! ─────────────                 ──────────────────            ─────
//! insert ──► ObservationListener ──► O(1) expansion           (no queries)
//! delete ──► ObservationListener ──► witness checks ──► point queries
//!                                          │                 (post-delete
//!                                          ▼                    state)
//!                                   MetadataCache
//!                                  (single writer,
//!                                    many readers)
//! ```
//!
//! Insertion-time maintenance is cheap and monotonic; deletion-time
//! maintenance detects whether the removed observation was a boundary
//! witness (cached extremum equal to its value, or geometry on the cached
//! envelope's edge) and only then recomputes from the store.
//!
//! # Modules
//!
//! - [`cache`]: the in-memory metadata snapshot, keyed by scope
//! - [`engine`]: insert/delete/rebuild maintenance
//! - [`store`]: the query surface the persistence layer implements
//! - [`listener`]: lifecycle event glue
//! - [`memory`]: in-memory store for tests and embedded use
//! - [`config`], [`error`]: engine configuration and error/warning types

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod listener;
pub mod memory;
pub mod store;

pub use cache::{CacheSnapshot, CacheStats, MetadataCache, TemporalExtrema};
pub use config::EngineConfig;
pub use engine::ConsistencyEngine;
pub use error::{CacheError, MaintenanceWarning, Result};
pub use listener::ObservationListener;
pub use memory::MemoryStore;
pub use store::{ObservationStore, StoreSession, TimeField};
