//! Error and warning types for cache maintenance

use sensos_core::{ObservationId, Scope};
use thiserror::Error;

/// Result type alias using [`CacheError`].
pub type Result<T> = std::result::Result<T, CacheError>;

/// Fatal errors: the maintenance call as a whole cannot proceed.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The observation lacks identity fields needed to determine its
    /// scopes; no safe partial update is possible.
    #[error("inconsistent observation state: {0}")]
    InconsistentState(String),

    /// A store session could not be acquired; no recompute query can run.
    #[error("store session unavailable: {0}")]
    SessionUnavailable(String),

    /// Store-level failure outside the per-field recovery path (e.g. scope
    /// enumeration during rebuild).
    #[error("store error: {0}")]
    Store(String),
}

impl CacheError {
    /// Create an inconsistent-state error.
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        CacheError::InconsistentState(msg.into())
    }

    /// Create a session-unavailable error.
    pub fn session_unavailable(msg: impl Into<String>) -> Self {
        CacheError::SessionUnavailable(msg.into())
    }

    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        CacheError::Store(msg.into())
    }
}

/// Recoverable per-scope/per-field conditions, accumulated during a
/// maintenance pass and reported out-of-band.
///
/// A warning never aborts sibling scope or field processing; the affected
/// cache entry is left at its prior (conservative) value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaintenanceWarning {
    /// A single recompute/existence query failed; the field or scope it
    /// covered was skipped.
    #[error("store query failed ({context}): {message}")]
    StoreQuery { context: String, message: String },

    /// The sampling geometry cannot produce a bounding envelope; spatial
    /// maintenance for the affected scopes kept the prior value.
    #[error("unsupported geometry on observation {observation}: {message}")]
    UnsupportedGeometry {
        observation: ObservationId,
        message: String,
    },

    /// An insert-path scope was skipped because the observation lacks the
    /// identity field that names it.
    #[error("observation {observation} missing identity: {message}")]
    MissingIdentity {
        observation: ObservationId,
        message: String,
    },
}

impl MaintenanceWarning {
    /// Create a store-query warning for a (scope, detail) context.
    pub fn store_query(scope: &Scope, detail: &str, message: impl Into<String>) -> Self {
        MaintenanceWarning::StoreQuery {
            context: format!("{} {}", scope, detail),
            message: message.into(),
        }
    }
}
