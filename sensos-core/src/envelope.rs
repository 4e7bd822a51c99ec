//! Spatial envelopes
//!
//! An [`Envelope`] is an axis-aligned bounding rectangle tagged with the
//! spatial reference system id of its coordinates. Envelopes are the unit
//! of spatial aggregation: per-scope caches hold one envelope that is the
//! union of the member geometries' bounds.

use geo::BoundingRect;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spatial reference system id (EPSG code).
pub type Srid = u32;

/// Default SRID for sampling geometries (WGS 84).
pub const DEFAULT_SRID: Srid = 4326;

/// Axis-aligned bounding rectangle with a spatial reference id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub srid: Srid,
}

impl Envelope {
    /// Create a new envelope.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, srid: Srid) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            srid,
        }
    }

    /// Compute the bounding envelope of a geometry.
    ///
    /// Returns `None` when the geometry has no bounding rectangle (e.g. an
    /// empty collection); callers treat that as an unsupported geometry.
    pub fn from_geometry(geom: &Geometry<f64>, srid: Srid) -> Option<Self> {
        let rect = geom.bounding_rect()?;
        Some(Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
            srid,
        })
    }

    /// Grow this envelope to include another (rectangle union).
    ///
    /// The SRID of `self` is retained.
    pub fn expand_to_include(&mut self, other: &Envelope) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// The rectangle union of two envelopes.
    pub fn union(mut self, other: &Envelope) -> Self {
        self.expand_to_include(other);
        self
    }

    /// Check if this envelope intersects another.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Check if this envelope fully contains another.
    pub fn contains(&self, other: &Envelope) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }

    /// Boundary-witness test: does `candidate` lie on this envelope's edge?
    ///
    /// Compares each edge of `candidate` against the *same* edge of `self`
    /// (min-x against min-x, max-x against max-x, min-y against min-y,
    /// max-y against max-y) with absolute tolerance `epsilon`. For a member
    /// geometry, whose bounds are by construction inside the aggregate,
    /// edge coincidence is exactly the condition for being a boundary
    /// witness of the aggregate.
    ///
    /// This is a heuristic gate for recomputation: a spurious match for a
    /// geometry merely *near* an edge costs one unnecessary recompute and
    /// is harmless.
    pub fn boundary_touches(&self, candidate: &Envelope, epsilon: f64) -> bool {
        (candidate.min_x - self.min_x).abs() < epsilon
            || (candidate.max_x - self.max_x).abs() < epsilon
            || (candidate.min_y - self.min_y).abs() < epsilon
            || (candidate.max_y - self.max_y).abs() < epsilon
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}] (srid {})",
            self.min_x, self.min_y, self.max_x, self.max_y, self.srid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{point, GeometryCollection};

    #[test]
    fn test_from_point_geometry() {
        let geom = Geometry::Point(point!(x: 3.0, y: 4.0));
        let env = Envelope::from_geometry(&geom, DEFAULT_SRID).unwrap();
        assert_eq!(env.min_x, 3.0);
        assert_eq!(env.max_x, 3.0);
        assert_eq!(env.min_y, 4.0);
        assert_eq!(env.max_y, 4.0);
    }

    #[test]
    fn test_empty_collection_has_no_envelope() {
        let geom = Geometry::GeometryCollection(GeometryCollection::<f64>::default());
        assert!(Envelope::from_geometry(&geom, DEFAULT_SRID).is_none());
    }

    #[test]
    fn test_expand_to_include() {
        let mut env = Envelope::new(0.0, 0.0, 5.0, 5.0, DEFAULT_SRID);
        env.expand_to_include(&Envelope::new(3.0, -2.0, 8.0, 4.0, DEFAULT_SRID));
        assert_eq!(env, Envelope::new(0.0, -2.0, 8.0, 5.0, DEFAULT_SRID));
    }

    #[test]
    fn test_boundary_touches_max_edge() {
        let cached = Envelope::new(0.0, 0.0, 10.0, 10.0, DEFAULT_SRID);
        let witness = Envelope::new(10.0, 10.0, 10.0, 10.0, DEFAULT_SRID);
        assert!(cached.boundary_touches(&witness, 0.01));
    }

    #[test]
    fn test_boundary_touches_interior_is_false() {
        let cached = Envelope::new(0.0, 0.0, 10.0, 10.0, DEFAULT_SRID);
        let interior = Envelope::new(4.0, 4.0, 6.0, 6.0, DEFAULT_SRID);
        assert!(!cached.boundary_touches(&interior, 0.01));
    }

    #[test]
    fn test_boundary_touches_is_sign_insensitive() {
        // A candidate slightly inside and one slightly outside both count.
        let cached = Envelope::new(0.0, 0.0, 10.0, 10.0, DEFAULT_SRID);
        let inside = Envelope::new(2.0, 2.0, 9.995, 5.0, DEFAULT_SRID);
        let outside = Envelope::new(2.0, 2.0, 10.005, 5.0, DEFAULT_SRID);
        assert!(cached.boundary_touches(&inside, 0.01));
        assert!(cached.boundary_touches(&outside, 0.01));
    }

    #[test]
    fn test_min_edge_detected() {
        // Far-apart values on the min side must not be masked by the max side.
        let cached = Envelope::new(0.0, 0.0, 10.0, 10.0, DEFAULT_SRID);
        let witness = Envelope::new(0.0, 5.0, 1.0, 6.0, DEFAULT_SRID);
        assert!(cached.boundary_touches(&witness, 0.01));
    }
}
