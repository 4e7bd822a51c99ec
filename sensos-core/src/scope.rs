//! Aggregation scopes

use crate::observation::{FeatureId, OfferingId, ProcedureId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An aggregation bucket over which extrema and envelopes are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Offering(OfferingId),
    Procedure(ProcedureId),
    Feature(FeatureId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Offering(id) => write!(f, "offering:{}", id),
            Scope::Procedure(id) => write!(f, "procedure:{}", id),
            Scope::Feature(id) => write!(f, "feature:{}", id),
        }
    }
}

/// The entity a feature of interest is associated with through at least
/// one stored observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssociationLink {
    Offering(OfferingId),
    Procedure(ProcedureId),
}

impl fmt::Display for AssociationLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssociationLink::Offering(id) => write!(f, "offering:{}", id),
            AssociationLink::Procedure(id) => write!(f, "procedure:{}", id),
        }
    }
}
