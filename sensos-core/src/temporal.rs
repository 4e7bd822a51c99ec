//! Temporal value types for observations
//!
//! This module provides the time positions observations carry:
//! - `TimeInstant`: a single position, concrete and/or indeterminate
//! - `TimePeriod`: a start/end pair of instants
//! - `PhenomenonTime`: instant-or-period sum type for the measured event
//!
//! ## Comparison Semantics
//!
//! Aggregation (min/max extraction) operates on concrete UTC positions only.
//! An instant that carries nothing but an indeterminate marker (`now`,
//! `unknown`, ...) contributes no candidate to extrema computation and never
//! matches a cached boundary value. Instants that carry both a concrete
//! position and a marker are compared by the concrete position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enumerated marker for a time position expressed without (or in addition
/// to) a concrete timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndeterminateTime {
    /// The position is the ever-moving present.
    Now,
    /// Some position before the associated instant (or before all time).
    Before,
    /// Some position after the associated instant (or after all time).
    After,
    /// The position exists but is not known.
    Unknown,
    /// A template placeholder, no position implied.
    Template,
}

impl fmt::Display for IndeterminateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndeterminateTime::Now => "now",
            IndeterminateTime::Before => "before",
            IndeterminateTime::After => "after",
            IndeterminateTime::Unknown => "unknown",
            IndeterminateTime::Template => "template",
        };
        write!(f, "{}", s)
    }
}

/// A single time position.
///
/// Either or both of the concrete position and the indeterminate marker may
/// be present. An instant with neither is not constructible through the
/// public constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInstant {
    position: Option<DateTime<Utc>>,
    indeterminate: Option<IndeterminateTime>,
}

impl TimeInstant {
    /// Create an instant at a concrete UTC position.
    pub fn at(position: DateTime<Utc>) -> Self {
        Self {
            position: Some(position),
            indeterminate: None,
        }
    }

    /// Create an instant carrying only an indeterminate marker.
    pub fn indeterminate(marker: IndeterminateTime) -> Self {
        Self {
            position: None,
            indeterminate: Some(marker),
        }
    }

    /// Attach an indeterminate marker to this instant.
    pub fn with_indeterminate(mut self, marker: IndeterminateTime) -> Self {
        self.indeterminate = Some(marker);
        self
    }

    /// The concrete UTC position, if any.
    pub fn position(&self) -> Option<DateTime<Utc>> {
        self.position
    }

    /// The indeterminate marker, if any.
    pub fn indeterminate_marker(&self) -> Option<IndeterminateTime> {
        self.indeterminate
    }

    /// Whether this instant carries a concrete position usable for
    /// aggregation and boundary-witness comparison.
    pub fn is_determinate(&self) -> bool {
        self.position.is_some()
    }
}

impl fmt::Display for TimeInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.position, self.indeterminate) {
            (Some(p), None) => write!(f, "{}", p.to_rfc3339()),
            (Some(p), Some(m)) => write!(f, "{} ({})", p.to_rfc3339(), m),
            (None, Some(m)) => write!(f, "{}", m),
            (None, None) => write!(f, "<empty>"),
        }
    }
}

/// A time period delimited by two instants.
///
/// No ordering between start and end is enforced here; producers are
/// expected to supply `start <= end` when both are determinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimePeriod {
    start: TimeInstant,
    end: TimeInstant,
}

impl TimePeriod {
    /// Create a period from two instants.
    pub fn new(start: TimeInstant, end: TimeInstant) -> Self {
        Self { start, end }
    }

    /// Create a period from two concrete UTC positions.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: TimeInstant::at(start),
            end: TimeInstant::at(end),
        }
    }

    /// The start instant.
    pub fn start(&self) -> &TimeInstant {
        &self.start
    }

    /// The end instant.
    pub fn end(&self) -> &TimeInstant {
        &self.end
    }
}

/// The time at which the measured event occurred: a single instant or a
/// period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhenomenonTime {
    Instant(TimeInstant),
    Period(TimePeriod),
}

impl PhenomenonTime {
    /// Convenience constructor for a concrete single instant.
    pub fn instant(position: DateTime<Utc>) -> Self {
        PhenomenonTime::Instant(TimeInstant::at(position))
    }

    /// Convenience constructor for a concrete period.
    pub fn period(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        PhenomenonTime::Period(TimePeriod::between(start, end))
    }

    /// The earliest concrete position, if any.
    ///
    /// For an instant this is the instant's position; for a period it is the
    /// start position. Indeterminate-only positions yield `None`.
    pub fn min_position(&self) -> Option<DateTime<Utc>> {
        match self {
            PhenomenonTime::Instant(i) => i.position(),
            PhenomenonTime::Period(p) => p.start().position(),
        }
    }

    /// The latest concrete position, if any.
    pub fn max_position(&self) -> Option<DateTime<Utc>> {
        match self {
            PhenomenonTime::Instant(i) => i.position(),
            PhenomenonTime::Period(p) => p.end().position(),
        }
    }
}
