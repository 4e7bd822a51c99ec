//! Cold-start rebuild
//!
//! Recomputes every scope from the store with the same point queries the
//! deletion path uses, then swaps the whole cache state atomically. Used
//! for initialization and for recovery after the cache is suspected stale
//! beyond what triggered recomputes can repair.

use crate::cache::{CacheSnapshot, MetadataCache, TemporalExtrema};
use crate::error::{CacheError, MaintenanceWarning, Result};
use crate::store::{ObservationStore, TimeField};
use sensos_core::{AssociationLink, Scope};

pub(crate) async fn run(
    cache: &MetadataCache,
    store: &dyn ObservationStore,
) -> Result<Vec<MaintenanceWarning>> {
    tracing::info!("metadata cache rebuild starting");
    let session = store.session().await?;
    let mut warnings = Vec::new();

    // Scope enumeration is all-or-nothing: a partial scope list would make
    // the swapped state silently incomplete.
    let offerings = session
        .list_offerings()
        .await
        .map_err(|e| CacheError::store(format!("list offerings: {}", e)))?;
    let procedures = session
        .list_procedures()
        .await
        .map_err(|e| CacheError::store(format!("list procedures: {}", e)))?;
    let features = session
        .list_features()
        .await
        .map_err(|e| CacheError::store(format!("list features: {}", e)))?;
    let associations = session
        .list_associations()
        .await
        .map_err(|e| CacheError::store(format!("list associations: {}", e)))?;

    let prior = cache.snapshot();
    let mut next = CacheSnapshot::default();

    let mut scopes = vec![Scope::Global];
    scopes.extend(offerings.into_iter().map(Scope::Offering));
    scopes.extend(procedures.into_iter().map(Scope::Procedure));
    scopes.extend(features.into_iter().map(Scope::Feature));

    for scope in &scopes {
        let mut extrema = TemporalExtrema::default();
        for field in TimeField::ALL {
            match session.query_time_extremum(scope, field).await {
                Ok(value) => extrema.set(field, value),
                Err(e) => {
                    // A failed recompute must not tighten the cache: keep
                    // the prior value for this one field.
                    extrema.set(field, prior.temporal.get(scope).and_then(|p| p.get(field)));
                    warnings.push(MaintenanceWarning::store_query(
                        scope,
                        &field.to_string(),
                        e.to_string(),
                    ));
                }
            }
        }
        if !extrema.is_empty() {
            next.temporal.insert(scope.clone(), extrema);
        }

        match session.query_envelope(scope).await {
            Ok(Some(envelope)) => {
                next.spatial.insert(scope.clone(), envelope);
            }
            Ok(None) => {}
            Err(e) => {
                if let Some(prev) = prior.spatial.get(scope) {
                    next.spatial.insert(scope.clone(), *prev);
                }
                warnings.push(MaintenanceWarning::store_query(
                    scope,
                    "envelope",
                    e.to_string(),
                ));
            }
        }
    }

    for (feature, link) in associations {
        match link {
            AssociationLink::Offering(offering) => {
                next.offering_associations.insert((feature, offering));
            }
            AssociationLink::Procedure(procedure) => {
                next.procedure_associations.insert((feature, procedure));
            }
        }
    }

    cache.replace_all(next);
    tracing::info!(
        scopes = scopes.len(),
        warnings = warnings.len(),
        "metadata cache rebuild finished"
    );
    Ok(warnings)
}
