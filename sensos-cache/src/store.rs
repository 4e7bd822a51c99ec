//! Authoritative store query surface
//!
//! The consistency engine never scans the observation store. It consumes a
//! narrow point-query interface the persistence layer implements:
//!
//! - a bounded existence query for association pruning
//! - per-scope envelope and time-extremum recompute queries
//! - entity enumeration, used only by the cold-start rebuild
//!
//! # Ordering requirement
//!
//! Recompute queries issued during a deletion pass must observe a store
//! state in which the deleted observation is already absent (run the
//! maintenance after the delete statement within the same transaction, or
//! strictly after commit). Otherwise contraction silently under-recomputes.
//!
//! # Sessions
//!
//! A maintenance pass acquires one [`StoreSession`] up front and issues all
//! of its queries through it; dropping the session releases the underlying
//! connection on every exit path.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sensos_core::{
    AssociationLink, Envelope, FeatureId, Observation, OfferingId, ProcedureId, Scope,
};
use std::fmt;

/// One of the four tracked time fields of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeField {
    PhenomenonMin,
    PhenomenonMax,
    ResultMin,
    ResultMax,
}

impl TimeField {
    /// All four fields, in cache layout order.
    pub const ALL: [TimeField; 4] = [
        TimeField::PhenomenonMin,
        TimeField::PhenomenonMax,
        TimeField::ResultMin,
        TimeField::ResultMax,
    ];

    /// Whether this field tracks a minimum (as opposed to a maximum).
    pub fn is_min(&self) -> bool {
        matches!(self, TimeField::PhenomenonMin | TimeField::ResultMin)
    }

    /// The value an observation contributes to this field, if any.
    ///
    /// Indeterminate-only time positions contribute nothing.
    pub fn candidate_from(&self, observation: &Observation) -> Option<DateTime<Utc>> {
        match self {
            TimeField::PhenomenonMin => observation.phenomenon_time.min_position(),
            TimeField::PhenomenonMax => observation.phenomenon_time.max_position(),
            TimeField::ResultMin | TimeField::ResultMax => observation.result_time.position(),
        }
    }
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeField::PhenomenonMin => "phenomenon-min",
            TimeField::PhenomenonMax => "phenomenon-max",
            TimeField::ResultMin => "result-min",
            TimeField::ResultMax => "result-max",
        };
        write!(f, "{}", s)
    }
}

/// Handle to the authoritative observation store.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Acquire a session for one maintenance pass.
    ///
    /// Failure here is fatal for the pass (no query can run without it).
    async fn session<'a>(&'a self) -> Result<Box<dyn StoreSession + 'a>>;
}

/// A scoped store connection serving the engine's point queries.
///
/// All queries reflect the current store state; see the module docs for the
/// deletion-path ordering requirement.
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// Does any stored observation still witness the given
    /// feature-to-entity pairing?
    async fn exists_observation_linking(
        &self,
        feature: &FeatureId,
        link: &AssociationLink,
    ) -> Result<bool>;

    /// The union envelope of the geometries of all features associated
    /// with the scope, or `None` when the scope has no geometry.
    async fn query_envelope(&self, scope: &Scope) -> Result<Option<Envelope>>;

    /// The authoritative extremum of one time field over the scope's
    /// observations, or `None` when the scope is empty (or holds only
    /// indeterminate positions).
    async fn query_time_extremum(
        &self,
        scope: &Scope,
        field: TimeField,
    ) -> Result<Option<DateTime<Utc>>>;

    /// All offerings with at least one stored observation.
    async fn list_offerings(&self) -> Result<Vec<OfferingId>>;

    /// All procedures with at least one stored observation.
    async fn list_procedures(&self) -> Result<Vec<ProcedureId>>;

    /// All features of interest with at least one stored observation.
    async fn list_features(&self) -> Result<Vec<FeatureId>>;

    /// All witnessed feature-to-entity associations.
    async fn list_associations(&self) -> Result<Vec<(FeatureId, AssociationLink)>>;
}
