//! Deletion-path contraction
//!
//! The hard case of cache maintenance. Insertion only ever widens bounds;
//! deletion must detect whether the removed observation was a boundary
//! witness and, only then, pay for a recompute against the store.
//!
//! # Pass structure
//!
//! Each call runs a fresh, non-reentrant pass through a fixed sequence of
//! phases:
//!
//! ```text
//! prepare -> prune-associations -> temporal-contraction
//!         -> spatial-contraction -> cleanup
//! ```
//!
//! `prepare` acquires the store session; `cleanup` releases it by dropping
//! the pass, on every exit path. The dedupe set that caps envelope
//! recomputes at one per scope lives in the pass and dies with it.
//!
//! # Witness checks
//!
//! - Temporal: a field is recomputed only when the cached value **equals**
//!   the deleted observation's value for that field — an exact witness
//!   check, applied per field with no cross-field sharing.
//! - Spatial: an envelope is recomputed only when the deleted observation's
//!   geometry lies on the cached envelope's edge under the configured
//!   tolerance (or the envelope is absent). A geometry strictly interior
//!   to a rectangle cannot be the witness that makes it shrink.
//!
//! Both checks over-approximate safely: a duplicate witness can make a
//! recompute unnecessary, never wrong, and no stale case escapes them.

use crate::cache::MetadataCache;
use crate::config::EngineConfig;
use crate::error::{CacheError, MaintenanceWarning, Result};
use crate::store::{ObservationStore, StoreSession, TimeField};
use sensos_core::{AssociationLink, FeatureId, Observation, ProcedureId, Scope};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Prepare,
    PruneAssociations,
    TemporalContraction,
    SpatialContraction,
    Cleanup,
}

/// Request-local state of one deletion maintenance pass.
struct DeletionPass<'a> {
    cache: &'a MetadataCache,
    config: &'a EngineConfig,
    session: Box<dyn StoreSession + 'a>,
    observation: &'a Observation,
    procedure: ProcedureId,
    feature: FeatureId,
    /// Scopes whose envelope recompute already ran (or failed) this pass.
    recomputed_envelopes: HashSet<Scope>,
    warnings: Vec<MaintenanceWarning>,
    phase: Phase,
}

pub(crate) async fn run(
    cache: &MetadataCache,
    store: &dyn ObservationStore,
    config: &EngineConfig,
    observation: &Observation,
) -> Result<Vec<MaintenanceWarning>> {
    tracing::debug!(observation = %observation.id, "deletion maintenance starting");

    // prepare: the session is held for the whole pass and released when
    // the pass is dropped, on success and failure alike.
    let session = store.session().await?;

    let procedure = observation.procedure.clone().ok_or_else(|| {
        CacheError::inconsistent(format!(
            "observation {} has no procedure; its scopes cannot be determined",
            observation.id
        ))
    })?;
    let feature = observation.feature.clone().ok_or_else(|| {
        CacheError::inconsistent(format!(
            "observation {} has no feature of interest; its scopes cannot be determined",
            observation.id
        ))
    })?;

    let mut pass = DeletionPass {
        cache,
        config,
        session,
        observation,
        procedure,
        feature,
        recomputed_envelopes: HashSet::new(),
        warnings: Vec::new(),
        phase: Phase::Prepare,
    };

    pass.prune_associations().await;
    pass.contract_temporal().await;
    pass.contract_spatial().await;
    Ok(pass.finish())
}

impl DeletionPass<'_> {
    fn enter(&mut self, phase: Phase) {
        tracing::trace!(
            observation = %self.observation.id,
            from = ?self.phase,
            to = ?phase,
            "deletion maintenance phase"
        );
        self.phase = phase;
    }

    /// One bounded existence query per feature pairing; associations whose
    /// last witness was the deleted observation are removed.
    async fn prune_associations(&mut self) {
        self.enter(Phase::PruneAssociations);

        let mut links = vec![AssociationLink::Procedure(self.procedure.clone())];
        links.extend(
            self.observation
                .offerings
                .iter()
                .cloned()
                .map(AssociationLink::Offering),
        );

        for link in links {
            let witnessed = self
                .session
                .exists_observation_linking(&self.feature, &link)
                .await;
            match witnessed {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(
                        feature = %self.feature,
                        %link,
                        "association lost its last witness; pruning"
                    );
                    match &link {
                        AssociationLink::Procedure(procedure) => self
                            .cache
                            .remove_procedure_association(&self.feature, procedure),
                        AssociationLink::Offering(offering) => self
                            .cache
                            .remove_offering_association(&self.feature, offering),
                    }
                }
                Err(e) => self.warn_query(
                    &Scope::Feature(self.feature.clone()),
                    &format!("association {}", link),
                    &e,
                ),
            }
        }
    }

    /// Recompute exactly the fields the deleted observation witnessed.
    async fn contract_temporal(&mut self) {
        self.enter(Phase::TemporalContraction);

        let mut scopes = vec![Scope::Global, Scope::Procedure(self.procedure.clone())];
        scopes.extend(self.observation.offerings.iter().cloned().map(Scope::Offering));

        for scope in scopes {
            for field in TimeField::ALL {
                let Some(deleted) = field.candidate_from(self.observation) else {
                    // Indeterminate positions never witness an extremum.
                    continue;
                };
                if self.cache.time_field(&scope, field) != Some(deleted) {
                    continue;
                }
                let recomputed = self.session.query_time_extremum(&scope, field).await;
                match recomputed {
                    Ok(value) => {
                        tracing::debug!(%scope, %field, "boundary witness deleted; field recomputed");
                        self.cache.set_time_field(&scope, field, value);
                    }
                    Err(e) => self.warn_query(&scope, &field.to_string(), &e),
                }
            }
        }
    }

    /// Recompute envelopes whose edge the deleted geometry sat on,
    /// at most once per scope per pass.
    async fn contract_spatial(&mut self) {
        self.enter(Phase::SpatialContraction);

        let Some(sampling) = self.observation.sampling_geometry.as_ref() else {
            return;
        };
        let feature_envelope = match sampling.envelope() {
            Some(envelope) => envelope,
            None => {
                self.warnings.push(MaintenanceWarning::UnsupportedGeometry {
                    observation: self.observation.id.clone(),
                    message: "sampling geometry has no bounding envelope".to_string(),
                });
                return;
            }
        };

        let mut scopes = vec![Scope::Global];
        scopes.extend(self.observation.offerings.iter().cloned().map(Scope::Offering));

        for scope in scopes {
            if self.recomputed_envelopes.contains(&scope) {
                continue;
            }
            let needs_recompute = match self.cache.envelope(&scope) {
                None => true,
                Some(cached) => {
                    cached.boundary_touches(&feature_envelope, self.config.boundary_epsilon)
                }
            };
            if !needs_recompute {
                self.cache.note_envelope_check_skipped();
                continue;
            }
            // Attempted is attempted: a failed recompute is not retried
            // for the same scope within this pass.
            self.recomputed_envelopes.insert(scope.clone());
            let recomputed = self.session.query_envelope(&scope).await;
            match recomputed {
                Ok(value) => {
                    tracing::debug!(%scope, "envelope boundary touched; recomputed");
                    self.cache.set_envelope(&scope, value);
                }
                Err(e) => self.warn_query(&scope, "envelope", &e),
            }
        }
    }

    fn warn_query(&mut self, scope: &Scope, detail: &str, error: &CacheError) {
        self.warnings.push(MaintenanceWarning::store_query(
            scope,
            detail,
            error.to_string(),
        ));
    }

    /// cleanup: log the outcome and hand back the accumulated warnings.
    /// Dropping `self` releases the store session.
    fn finish(mut self) -> Vec<MaintenanceWarning> {
        self.enter(Phase::Cleanup);
        tracing::debug!(
            observation = %self.observation.id,
            warnings = self.warnings.len(),
            envelopes_recomputed = self.recomputed_envelopes.len(),
            "deletion maintenance finished"
        );
        self.warnings
    }
}
