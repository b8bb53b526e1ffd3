//! Error types for Lagoon
//!
//! All errors in the engine are converted to `EngineError`. The variants
//! follow the recovery policy each caller applies: `NotFound` triggers
//! provisioning or aborts, `Malformed` degrades to placeholder rendering,
//! `Remote` triggers re-reconciliation from authoritative state, and
//! `Conflict` is treated as success under insert-or-ignore semantics.

use thiserror::Error;

/// Engine-wide error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// Identity, profile, or conversation absent
    #[error("Resource not found")]
    NotFound,

    /// Operation requires ownership or a privileged role
    #[error("Access denied")]
    Forbidden,

    /// Media reference or record failed normalization
    #[error("Malformed data: {0}")]
    Malformed(String),

    /// Remote data service call failed
    #[error("Remote service error: {0}")]
    Remote(String),

    /// Duplicate create rejected by a server-side uniqueness constraint.
    /// Callers performing idempotent toggles treat this as success.
    #[error("Conflicting write")]
    Conflict,

    /// Validation error on caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Media storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal engine error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl EngineError {
    /// Metric label for this error
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::NotFound => "not_found",
            EngineError::Forbidden => "forbidden",
            EngineError::Malformed(_) => "malformed",
            EngineError::Remote(_) => "remote",
            EngineError::Conflict => "conflict",
            EngineError::Validation(_) => "validation",
            EngineError::Config(_) => "config",
            EngineError::Storage(_) => "storage",
            EngineError::Internal(_) => "internal",
        }
    }

    /// True for outcomes an idempotent toggle counts as success.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict)
    }
}

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;
