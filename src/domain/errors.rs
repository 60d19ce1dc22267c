//! Domain error types
//!
//! This module defines the error taxonomy shared by all pipeline stages.
//! Errors are domain-specific and don't expose third-party driver types;
//! every propagated failure carries the original cause's message inside a
//! stage-specific wrapper category so the caller can decide whether to
//! re-invoke with the same checkpoint or halt.

use std::fmt;
use thiserror::Error;

/// Main Ferry error type
///
/// This is the primary error type used throughout the application.
/// It wraps stage-specific error types and provides context for error
/// handling.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Extract stage errors
    #[error("Extract error: {0}")]
    Extract(#[from] ExtractError),

    /// Load stage errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Secret lookup failed; not retryable without operator intervention
    #[error("Credentials unavailable: {0}")]
    CredentialUnavailable(String),

    /// Input fails shape/type constraints
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Extract-stage errors
///
/// Connection and timeout failures are retryable by re-invocation with the
/// same checkpoint; a connection failure also invalidates the cached source
/// handle so a half-open handle is never reused.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Failed to establish or maintain a source connection
    #[error("Failed to connect to source store: {0}")]
    Connection(String),

    /// Query exceeded its execution budget
    #[error("Source query exceeded its time budget: {0}")]
    Timeout(String),

    /// Query failed for a non-connectivity reason
    #[error("Source query failed: {0}")]
    Query(String),
}

/// Load-stage errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to establish or maintain a target connection
    #[error("Failed to connect to target store: {0}")]
    Connection(String),

    /// Statement exceeded its execution budget; retryable by the caller
    /// with the same checkpoint, not retried internally
    #[error("Target statement exceeded its time budget: {0}")]
    Timeout(String),

    /// Connection pool could not be built or drained of a handle outside
    /// the classified write path
    #[error("Connection pool unavailable: {0}")]
    Pool(String),

    /// Constraint violation; a data error, never retried
    #[error("{kind} violation: {message}")]
    Permanent {
        kind: ConstraintKind,
        message: String,
    },

    /// Transient write class that survived every retry attempt
    #[error("{kind} persisted after {attempts} attempts: {message}")]
    TransientExhausted {
        kind: TransientKind,
        attempts: usize,
        message: String,
    },

    /// Statement failure outside the classified transient/constraint sets
    #[error("Statement failed: {0}")]
    Statement(String),
}

/// Transient write-failure classes, safe to retry with backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// Serialization conflict (SQLSTATE 40001)
    Serialization,
    /// Deadlock detected (SQLSTATE 40P01)
    Deadlock,
    /// Connection pool exhausted before a handle became available
    PoolExhausted,
    /// Transient network/connection failure
    Connection,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransientKind::Serialization => "serialization conflict",
            TransientKind::Deadlock => "deadlock",
            TransientKind::PoolExhausted => "pool exhaustion",
            TransientKind::Connection => "connection failure",
        };
        write!(f, "{name}")
    }
}

/// Permanent constraint-violation classes, never retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Uniqueness violation (SQLSTATE 23505)
    Unique,
    /// Foreign-key violation (SQLSTATE 23503)
    ForeignKey,
    /// Check-constraint violation (SQLSTATE 23514)
    Check,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::Unique => "uniqueness",
            ConstraintKind::ForeignKey => "foreign-key",
            ConstraintKind::Check => "check-constraint",
        };
        write!(f, "{name}")
    }
}

/// Classified failure surfaced by a single target-store write
///
/// The loader's retry policy dispatches on this classification: transient
/// failures are retried with backoff, permanent failures propagate
/// immediately, and fatal failures bypass the retry loop entirely.
#[derive(Debug, Error)]
pub enum WriteError {
    /// May succeed on retry with the same inputs
    #[error("{kind}: {message}")]
    Transient {
        kind: TransientKind,
        message: String,
    },

    /// Will not succeed on retry without external correction
    #[error("{kind} violation: {message}")]
    Permanent {
        kind: ConstraintKind,
        message: String,
    },

    /// Not a write-classification matter at all (credentials, timeouts)
    #[error(transparent)]
    Fatal(#[from] FerryError),
}

impl WriteError {
    /// True when the failure indicates a broken connection, which must
    /// invalidate the cached handle before any retry
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            WriteError::Transient {
                kind: TransientKind::Connection,
                ..
            }
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for FerryError {
    fn from(err: std::io::Error) -> Self {
        FerryError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for FerryError {
    fn from(err: serde_json::Error) -> Self {
        FerryError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for FerryError {
    fn from(err: toml::de::Error) -> Self {
        FerryError::Configuration(format!("TOML parse error: {err}"))
    }
}
