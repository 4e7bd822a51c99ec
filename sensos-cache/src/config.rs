//! Consistency engine configuration

use serde::{Deserialize, Serialize};

/// Configuration for the consistency engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Absolute tolerance for the envelope boundary-witness test.
    /// Default: 0.01 (degrees for WGS 84 data).
    ///
    /// Larger values trigger more recomputes (always safe, occasionally
    /// unnecessary); smaller values rely on exact edge coincidence.
    pub boundary_epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            boundary_epsilon: 0.01,
        }
    }
}

impl EngineConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the boundary-witness tolerance.
    pub fn with_boundary_epsilon(mut self, epsilon: f64) -> Self {
        self.boundary_epsilon = epsilon;
        self
    }
}
