//! Core value types for the Sensos observation service.
//!
//! This crate holds the pure value types shared across the service:
//!
//! - [`temporal`]: time instants (with indeterminate markers), periods, and
//!   the instant-or-period phenomenon time
//! - [`envelope`]: axis-aligned bounding envelopes with a spatial reference
//!   id
//! - [`observation`]: the observation model, identifier newtypes, and the
//!   tagged-union result value
//! - [`scope`]: the aggregation buckets metadata is tracked under
//!
//! No I/O, no persistence, no protocol encoding lives here.

pub mod envelope;
pub mod observation;
pub mod scope;
pub mod temporal;

pub use envelope::{Envelope, Srid, DEFAULT_SRID};
pub use observation::{
    FeatureId, Observation, ObservationId, ObservationValue, OfferingId, ProcedureId,
    SamplingGeometry,
};
pub use scope::{AssociationLink, Scope};
pub use temporal::{IndeterminateTime, PhenomenonTime, TimeInstant, TimePeriod};
