//! In-memory observation store
//!
//! A [`MemoryStore`] keeps whole observations in a guarded map and answers
//! the engine's query surface directly from them. It exists for tests and
//! for embedded deployments without an external persistence layer; the
//! production store implements [`ObservationStore`] over its own query
//! machinery.
//!
//! Deletions take effect in the map immediately, so the deletion-path
//! ordering requirement holds as long as callers remove the observation
//! before invoking maintenance.

use crate::error::Result;
use crate::store::{ObservationStore, StoreSession, TimeField};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sensos_core::{
    AssociationLink, Envelope, FeatureId, Observation, ObservationId, OfferingId, ProcedureId,
    Scope,
};
use std::collections::HashMap;
use std::sync::RwLock;

/// An observation store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    observations: RwLock<HashMap<ObservationId, Observation>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation.
    pub fn insert(&self, observation: Observation) {
        self.observations
            .write()
            .unwrap()
            .insert(observation.id.clone(), observation);
    }

    /// Remove an observation, returning it if present.
    pub fn remove(&self, id: &ObservationId) -> Option<Observation> {
        self.observations.write().unwrap().remove(id)
    }

    /// Number of stored observations.
    pub fn len(&self) -> usize {
        self.observations.read().unwrap().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn in_scope(observation: &Observation, scope: &Scope) -> bool {
    match scope {
        Scope::Global => true,
        Scope::Offering(id) => observation.offerings.contains(id),
        Scope::Procedure(id) => observation.procedure.as_ref() == Some(id),
        Scope::Feature(id) => observation.feature.as_ref() == Some(id),
    }
}

fn carries_link(observation: &Observation, feature: &FeatureId, link: &AssociationLink) -> bool {
    if observation.feature.as_ref() != Some(feature) {
        return false;
    }
    match link {
        AssociationLink::Offering(id) => observation.offerings.contains(id),
        AssociationLink::Procedure(id) => observation.procedure.as_ref() == Some(id),
    }
}

struct MemorySession<'a> {
    store: &'a MemoryStore,
}

#[async_trait]
impl ObservationStore for MemoryStore {
    async fn session<'a>(&'a self) -> Result<Box<dyn StoreSession + 'a>> {
        Ok(Box::new(MemorySession { store: self }))
    }
}

#[async_trait]
impl StoreSession for MemorySession<'_> {
    async fn exists_observation_linking(
        &self,
        feature: &FeatureId,
        link: &AssociationLink,
    ) -> Result<bool> {
        let observations = self.store.observations.read().unwrap();
        Ok(observations.values().any(|o| carries_link(o, feature, link)))
    }

    async fn query_envelope(&self, scope: &Scope) -> Result<Option<Envelope>> {
        let observations = self.store.observations.read().unwrap();
        let mut result: Option<Envelope> = None;
        for observation in observations.values().filter(|o| in_scope(o, scope)) {
            // Geometries without a bounding rectangle contribute nothing.
            let Some(env) = observation
                .sampling_geometry
                .as_ref()
                .and_then(|g| g.envelope())
            else {
                continue;
            };
            match &mut result {
                Some(acc) => acc.expand_to_include(&env),
                None => result = Some(env),
            }
        }
        Ok(result)
    }

    async fn query_time_extremum(
        &self,
        scope: &Scope,
        field: TimeField,
    ) -> Result<Option<DateTime<Utc>>> {
        let observations = self.store.observations.read().unwrap();
        let candidates = observations
            .values()
            .filter(|o| in_scope(o, scope))
            .filter_map(|o| field.candidate_from(o));
        Ok(if field.is_min() {
            candidates.min()
        } else {
            candidates.max()
        })
    }

    async fn list_offerings(&self) -> Result<Vec<OfferingId>> {
        let observations = self.store.observations.read().unwrap();
        let mut ids: Vec<OfferingId> = observations
            .values()
            .flat_map(|o| o.offerings.iter().cloned())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn list_procedures(&self) -> Result<Vec<ProcedureId>> {
        let observations = self.store.observations.read().unwrap();
        let mut ids: Vec<ProcedureId> = observations
            .values()
            .filter_map(|o| o.procedure.clone())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn list_features(&self) -> Result<Vec<FeatureId>> {
        let observations = self.store.observations.read().unwrap();
        let mut ids: Vec<FeatureId> = observations
            .values()
            .filter_map(|o| o.feature.clone())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn list_associations(&self) -> Result<Vec<(FeatureId, AssociationLink)>> {
        let observations = self.store.observations.read().unwrap();
        let mut links = Vec::new();
        for observation in observations.values() {
            let Some(feature) = observation.feature.clone() else {
                continue;
            };
            if let Some(procedure) = observation.procedure.clone() {
                links.push((feature.clone(), AssociationLink::Procedure(procedure)));
            }
            for offering in &observation.offerings {
                links.push((feature.clone(), AssociationLink::Offering(offering.clone())));
            }
        }
        links.sort();
        links.dedup();
        Ok(links)
    }
}
