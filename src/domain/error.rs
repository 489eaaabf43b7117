//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the tree model itself.
/// These are independent of any store or I/O concern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("multiple entries with identical names: {0}")]
    DuplicateKey(String),

    #[error("key is both a leaf and a group: {0}")]
    PathConflict(String),

    #[error("unknown element type tag: {0}")]
    UnknownElementType(String),

    #[error("invalid leaf: {reason}")]
    InvalidLeaf { reason: String },

    #[error("cannot decode byte string at {path}: {reason}")]
    InvalidText { path: String, reason: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
