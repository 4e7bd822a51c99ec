//! Lifecycle event glue
//!
//! The mutation path notifies the engine through [`ObservationListener`]:
//! a direct, awaited call from the transaction that created or removed the
//! observation, so cache effects are visible before the triggering
//! operation's response returns.
//!
//! The triggering operation succeeds from the caller's point of view even
//! under partial cache-maintenance failure — the cache is a performance
//! optimization, not the source of truth. The engine's implementation
//! therefore reports warnings and fatal maintenance errors out-of-band via
//! `tracing` instead of propagating them.

use crate::engine::ConsistencyEngine;
use async_trait::async_trait;
use sensos_core::Observation;

/// Receiver of observation lifecycle notifications.
#[async_trait]
pub trait ObservationListener: Send + Sync {
    /// An observation has been committed to the store.
    async fn on_observation_inserted(&self, observation: &Observation);

    /// An observation has been removed from the store. The store already
    /// reflects its absence.
    async fn on_observation_deleted(&self, observation: &Observation);
}

#[async_trait]
impl ObservationListener for ConsistencyEngine {
    async fn on_observation_inserted(&self, observation: &Observation) {
        for warning in self.observation_inserted(observation).await {
            tracing::warn!(observation = %observation.id, %warning, "cache maintenance warning");
        }
    }

    async fn on_observation_deleted(&self, observation: &Observation) {
        match self.observation_deleted(observation).await {
            Ok(warnings) => {
                for warning in warnings {
                    tracing::warn!(observation = %observation.id, %warning, "cache maintenance warning");
                }
            }
            Err(error) => {
                tracing::error!(
                    observation = %observation.id,
                    %error,
                    "cache maintenance failed; cache is stale until the next rebuild"
                );
            }
        }
    }
}
