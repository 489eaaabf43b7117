//! Store-level errors

use thiserror::Error;

use crate::domain::DomainError;

/// Errors raised by hierarchical stores.
///
/// Lower-level I/O failures keep the original `std::io::Error` as their source.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not a dataset: {0}")]
    NotADataset(String),

    #[error("not a group: {0}")]
    NotAGroup(String),

    #[error("invalid store path: {0}")]
    InvalidPath(String),

    #[error("store root must be a group, got a {0}")]
    InvalidRoot(&'static str),

    #[error("invalid store entry {path}: {message}")]
    Format { path: String, message: String },

    #[error("store is closed")]
    Closed,

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn format(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
