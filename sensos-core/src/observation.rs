//! Observation model
//!
//! An [`Observation`] is a value measured by a procedure at a feature of
//! interest, tagged with one or more offerings, a phenomenon time and a
//! result time, and optionally a sampling geometry. Observations are
//! immutable once stored; they are only ever created or deleted.
//!
//! The result value is a tagged union ([`ObservationValue`]) dispatched by
//! pattern match; cache maintenance only ever extracts geometry and time
//! inputs from it.
//!
//! Identity fields (`procedure`, `feature`) are optional at the type level:
//! a lifecycle event carrying an observation without them is representable,
//! and it is the consistency engine's job to reject it.

use crate::envelope::{Envelope, Srid, DEFAULT_SRID};
use crate::temporal::{PhenomenonTime, TimeInstant};
use geo_types::{Geometry, Point};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

identifier!(
    /// Identifier of a stored observation.
    ObservationId
);
identifier!(
    /// Identifier of an offering.
    OfferingId
);
identifier!(
    /// Identifier of a procedure (sensor).
    ProcedureId
);
identifier!(
    /// Identifier of a feature of interest.
    FeatureId
);

/// The result value of an observation.
///
/// Only the `Geometry` payload and the observation's time fields feed the
/// metadata cache; the remaining variants are carried opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationValue {
    Quantity { value: f64, unit: Option<String> },
    Count(i64),
    Boolean(bool),
    Text(String),
    Category { value: String, codespace: Option<String> },
    Geometry(Geometry<f64>),
    Complex(Vec<(String, ObservationValue)>),
}

/// A geometry with its spatial reference id, as sampled at observation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingGeometry {
    pub geometry: Geometry<f64>,
    pub srid: Srid,
}

impl SamplingGeometry {
    /// Create a sampling geometry.
    pub fn new(geometry: Geometry<f64>, srid: Srid) -> Self {
        Self { geometry, srid }
    }

    /// Convenience constructor for a WGS 84 point.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(Geometry::Point(Point::new(x, y)), DEFAULT_SRID)
    }

    /// The bounding envelope of the geometry, or `None` when the geometry
    /// kind does not yield one.
    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::from_geometry(&self.geometry, self.srid)
    }
}

/// A stored observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: ObservationId,
    pub procedure: Option<ProcedureId>,
    pub feature: Option<FeatureId>,
    pub offerings: Vec<OfferingId>,
    pub phenomenon_time: PhenomenonTime,
    pub result_time: TimeInstant,
    pub value: ObservationValue,
    pub sampling_geometry: Option<SamplingGeometry>,
}

impl Observation {
    /// Create an observation with no constellation attached yet.
    pub fn new(
        id: impl Into<ObservationId>,
        phenomenon_time: PhenomenonTime,
        result_time: TimeInstant,
        value: ObservationValue,
    ) -> Self {
        Self {
            id: id.into(),
            procedure: None,
            feature: None,
            offerings: Vec::new(),
            phenomenon_time,
            result_time,
            value,
            sampling_geometry: None,
        }
    }

    /// Set the procedure.
    pub fn with_procedure(mut self, procedure: impl Into<ProcedureId>) -> Self {
        self.procedure = Some(procedure.into());
        self
    }

    /// Set the feature of interest.
    pub fn with_feature(mut self, feature: impl Into<FeatureId>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    /// Add an offering.
    pub fn with_offering(mut self, offering: impl Into<OfferingId>) -> Self {
        self.offerings.push(offering.into());
        self
    }

    /// Set the sampling geometry.
    pub fn with_sampling_geometry(mut self, geometry: SamplingGeometry) -> Self {
        self.sampling_geometry = Some(geometry);
        self
    }
}
