//! Cache consistency engine
//!
//! Reacts to observation lifecycle events and keeps the [`MetadataCache`]
//! synchronized with the authoritative store:
//!
//! - **Insert**: monotonic O(1) expansion of the touched scopes' extrema,
//!   envelopes, and associations. No store queries — a newly added point
//!   can never be more extreme than the bound it is compared against in
//!   the direction that matters, so expansion alone is always correct.
//! - **Delete**: selective contraction. Only when the removed observation
//!   was a candidate boundary witness (cached value equal to the deleted
//!   one, or geometry on the cached envelope's edge) is the affected field
//!   or envelope recomputed from the store.
//! - **Rebuild**: the cold-start/recovery path — recompute every scope
//!   with the same query machinery, then swap the whole cache atomically.
//!
//! # Concurrency
//!
//! Maintenance passes are serialized by an internal async mutex: the cache
//! has exactly one writer at a time, and readers only contend for the
//! duration of a single whole-value swap. There is no mid-pass
//! cancellation; a pass finishes with accumulated warnings or the call
//! fails as a whole, leaving the cache stale-but-conservative until the
//! next triggered recompute or rebuild.

mod delete;
mod insert;
mod rebuild;

use crate::cache::MetadataCache;
use crate::config::EngineConfig;
use crate::error::{MaintenanceWarning, Result};
use crate::store::ObservationStore;
use sensos_core::Observation;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The sole writer of the metadata cache.
pub struct ConsistencyEngine {
    cache: Arc<MetadataCache>,
    store: Arc<dyn ObservationStore>,
    config: EngineConfig,
    maintenance: Mutex<()>,
}

impl ConsistencyEngine {
    /// Create an engine with the default configuration.
    pub fn new(cache: Arc<MetadataCache>, store: Arc<dyn ObservationStore>) -> Self {
        Self::with_config(cache, store, EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(
        cache: Arc<MetadataCache>,
        store: Arc<dyn ObservationStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            cache,
            store,
            config,
            maintenance: Mutex::new(()),
        }
    }

    /// The cache this engine maintains.
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Expand the cache for a newly committed observation.
    ///
    /// Costs O(scopes touched) cache writes and zero store queries.
    /// Missing identity fields skip the scopes they name and surface as
    /// warnings.
    pub async fn observation_inserted(&self, observation: &Observation) -> Vec<MaintenanceWarning> {
        let _guard = self.maintenance.lock().await;
        insert::apply(&self.cache, observation)
    }

    /// Contract the cache for an observation that has been removed.
    ///
    /// The store must already reflect the observation's absence when this
    /// is called (see the [`crate::store`] ordering requirement).
    ///
    /// Per-field and per-scope failures are accumulated as warnings and
    /// never abort sibling work; the returned error is reserved for an
    /// observation whose scopes cannot be determined and for a store
    /// session that cannot be acquired at all.
    pub async fn observation_deleted(
        &self,
        observation: &Observation,
    ) -> Result<Vec<MaintenanceWarning>> {
        let _guard = self.maintenance.lock().await;
        delete::run(&self.cache, self.store.as_ref(), &self.config, observation).await
    }

    /// Recompute every scope from the store and atomically swap the cache.
    ///
    /// Used for initialization and recovery; the expensive degenerate case
    /// of the same recompute machinery the deletion path uses.
    pub async fn rebuild(&self) -> Result<Vec<MaintenanceWarning>> {
        let _guard = self.maintenance.lock().await;
        rebuild::run(&self.cache, self.store.as_ref()).await
    }
}

impl std::fmt::Debug for ConsistencyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyEngine")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}
