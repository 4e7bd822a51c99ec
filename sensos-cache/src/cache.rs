//! The metadata cache
//!
//! An in-memory snapshot, keyed by scope, of temporal extrema, spatial
//! envelopes, and entity associations. The cache is purely derived state:
//! it owns nothing persistent and is fully reconstructible from the store.
//!
//! # Access discipline
//!
//! Single writer, many readers. Every accessor works in whole values per
//! (scope, field) behind one `RwLock` — a reader never observes a torn
//! min/max pair, and a writer replaces a field's value in one step rather
//! than merging into it. The consistency engine is the sole writer; all
//! mutating methods are crate-private.

use crate::store::TimeField;
use chrono::{DateTime, Utc};
use sensos_core::{Envelope, FeatureId, OfferingId, ProcedureId, Scope};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// The four tracked time extrema of one scope, each independently optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemporalExtrema {
    pub phenomenon_min: Option<DateTime<Utc>>,
    pub phenomenon_max: Option<DateTime<Utc>>,
    pub result_min: Option<DateTime<Utc>>,
    pub result_max: Option<DateTime<Utc>>,
}

impl TemporalExtrema {
    /// Read one field.
    pub fn get(&self, field: TimeField) -> Option<DateTime<Utc>> {
        match field {
            TimeField::PhenomenonMin => self.phenomenon_min,
            TimeField::PhenomenonMax => self.phenomenon_max,
            TimeField::ResultMin => self.result_min,
            TimeField::ResultMax => self.result_max,
        }
    }

    /// Replace one field.
    pub fn set(&mut self, field: TimeField, value: Option<DateTime<Utc>>) {
        match field {
            TimeField::PhenomenonMin => self.phenomenon_min = value,
            TimeField::PhenomenonMax => self.phenomenon_max = value,
            TimeField::ResultMin => self.result_min = value,
            TimeField::ResultMax => self.result_max = value,
        }
    }

    /// Widen one field toward a candidate; returns true if it moved.
    ///
    /// Min fields take the earlier value, max fields the later. An absent
    /// field always takes the candidate.
    pub fn expand(&mut self, field: TimeField, candidate: DateTime<Utc>) -> bool {
        let current = self.get(field);
        let moved = match current {
            None => true,
            Some(cur) => {
                if field.is_min() {
                    candidate < cur
                } else {
                    candidate > cur
                }
            }
        };
        if moved {
            self.set(field, Some(candidate));
        }
        moved
    }

    /// Whether all four fields are absent.
    pub fn is_empty(&self) -> bool {
        self.phenomenon_min.is_none()
            && self.phenomenon_max.is_none()
            && self.result_min.is_none()
            && self.result_max.is_none()
    }
}

/// A full copy of the cache contents.
///
/// Used for the atomic cold-start swap and for state comparison in tests.
/// Statistics are not part of the snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    pub temporal: HashMap<Scope, TemporalExtrema>,
    pub spatial: HashMap<Scope, Envelope>,
    pub offering_associations: HashSet<(FeatureId, OfferingId)>,
    pub procedure_associations: HashSet<(FeatureId, ProcedureId)>,
}

/// Maintenance counters, in snapshot form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Insert-path field/envelope widenings that changed a cached value.
    pub expansions: u64,
    /// Per-field temporal recomputes applied.
    pub field_recomputes: u64,
    /// Per-scope envelope recomputes applied.
    pub envelope_recomputes: u64,
    /// Envelope checks gated off by the boundary test (no recompute).
    pub envelope_checks_skipped: u64,
    /// Associations created.
    pub associations_added: u64,
    /// Associations removed after losing their last witness.
    pub associations_pruned: u64,
}

/// The in-memory metadata cache.
pub struct MetadataCache {
    state: RwLock<CacheSnapshot>,
    stats: RwLock<CacheStats>,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataCache {
    /// Create an empty cache. Entries are created lazily on first insert.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CacheSnapshot::default()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    // === readers ===

    /// The temporal extrema of a scope, if tracked.
    pub fn temporal_extrema(&self, scope: &Scope) -> Option<TemporalExtrema> {
        self.state.read().unwrap().temporal.get(scope).copied()
    }

    /// One time field of a scope.
    pub fn time_field(&self, scope: &Scope, field: TimeField) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .unwrap()
            .temporal
            .get(scope)
            .and_then(|e| e.get(field))
    }

    /// The spatial envelope of a scope, if tracked.
    pub fn envelope(&self, scope: &Scope) -> Option<Envelope> {
        self.state.read().unwrap().spatial.get(scope).copied()
    }

    /// Whether the feature is associated with the offering.
    pub fn has_offering_association(&self, feature: &FeatureId, offering: &OfferingId) -> bool {
        self.state
            .read()
            .unwrap()
            .offering_associations
            .contains(&(feature.clone(), offering.clone()))
    }

    /// Whether the feature is associated with the procedure.
    pub fn has_procedure_association(&self, feature: &FeatureId, procedure: &ProcedureId) -> bool {
        self.state
            .read()
            .unwrap()
            .procedure_associations
            .contains(&(feature.clone(), procedure.clone()))
    }

    /// A full copy of the current contents.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.state.read().unwrap().clone()
    }

    /// Current maintenance counters.
    pub fn stats(&self) -> CacheStats {
        *self.stats.read().unwrap()
    }

    // === writers (consistency engine only) ===

    /// Widen one time field of a scope toward a candidate.
    pub(crate) fn expand_time_field(
        &self,
        scope: &Scope,
        field: TimeField,
        candidate: DateTime<Utc>,
    ) {
        let mut state = self.state.write().unwrap();
        let extrema = state.temporal.entry(scope.clone()).or_default();
        if extrema.expand(field, candidate) {
            self.stats.write().unwrap().expansions += 1;
        }
    }

    /// Replace one time field of a scope with an authoritative value.
    ///
    /// `None` clears the field; a scope whose extrema become entirely
    /// absent is dropped from the map.
    pub(crate) fn set_time_field(
        &self,
        scope: &Scope,
        field: TimeField,
        value: Option<DateTime<Utc>>,
    ) {
        let mut state = self.state.write().unwrap();
        match value {
            Some(v) => {
                state.temporal.entry(scope.clone()).or_default().set(field, Some(v));
            }
            None => {
                if let Some(extrema) = state.temporal.get_mut(scope) {
                    extrema.set(field, None);
                    if extrema.is_empty() {
                        state.temporal.remove(scope);
                    }
                }
            }
        }
        self.stats.write().unwrap().field_recomputes += 1;
    }

    /// Widen a scope's envelope to include another.
    pub(crate) fn expand_envelope(&self, scope: &Scope, envelope: &Envelope) {
        let mut state = self.state.write().unwrap();
        match state.spatial.get_mut(scope) {
            Some(current) => {
                let before = *current;
                current.expand_to_include(envelope);
                if *current != before {
                    self.stats.write().unwrap().expansions += 1;
                }
            }
            None => {
                state.spatial.insert(scope.clone(), *envelope);
                self.stats.write().unwrap().expansions += 1;
            }
        }
    }

    /// Replace a scope's envelope with an authoritative value.
    pub(crate) fn set_envelope(&self, scope: &Scope, envelope: Option<Envelope>) {
        let mut state = self.state.write().unwrap();
        match envelope {
            Some(e) => {
                state.spatial.insert(scope.clone(), e);
            }
            None => {
                state.spatial.remove(scope);
            }
        }
        self.stats.write().unwrap().envelope_recomputes += 1;
    }

    /// Record an envelope check that was gated off by the boundary test.
    pub(crate) fn note_envelope_check_skipped(&self) {
        self.stats.write().unwrap().envelope_checks_skipped += 1;
    }

    /// Ensure a feature-offering association exists.
    pub(crate) fn add_offering_association(&self, feature: &FeatureId, offering: &OfferingId) {
        let inserted = self
            .state
            .write()
            .unwrap()
            .offering_associations
            .insert((feature.clone(), offering.clone()));
        if inserted {
            self.stats.write().unwrap().associations_added += 1;
        }
    }

    /// Ensure a feature-procedure association exists.
    pub(crate) fn add_procedure_association(&self, feature: &FeatureId, procedure: &ProcedureId) {
        let inserted = self
            .state
            .write()
            .unwrap()
            .procedure_associations
            .insert((feature.clone(), procedure.clone()));
        if inserted {
            self.stats.write().unwrap().associations_added += 1;
        }
    }

    /// Remove a feature-offering association.
    pub(crate) fn remove_offering_association(&self, feature: &FeatureId, offering: &OfferingId) {
        let removed = self
            .state
            .write()
            .unwrap()
            .offering_associations
            .remove(&(feature.clone(), offering.clone()));
        if removed {
            self.stats.write().unwrap().associations_pruned += 1;
        }
    }

    /// Remove a feature-procedure association.
    pub(crate) fn remove_procedure_association(&self, feature: &FeatureId, procedure: &ProcedureId) {
        let removed = self
            .state
            .write()
            .unwrap()
            .procedure_associations
            .remove(&(feature.clone(), procedure.clone()));
        if removed {
            self.stats.write().unwrap().associations_pruned += 1;
        }
    }

    /// Atomically replace the entire cache contents (cold-start rebuild).
    pub(crate) fn replace_all(&self, snapshot: CacheSnapshot) {
        *self.state.write().unwrap() = snapshot;
    }

    /// Drop all entries.
    pub fn clear(&self) {
        *self.state.write().unwrap() = CacheSnapshot::default();
    }
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap();
        f.debug_struct("MetadataCache")
            .field("temporal_scopes", &state.temporal.len())
            .field("spatial_scopes", &state.spatial.len())
            .field("offering_associations", &state.offering_associations.len())
            .field("procedure_associations", &state.procedure_associations.len())
            .finish()
    }
}
