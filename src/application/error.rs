//! Application-level errors (wraps domain and store errors)

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::StoreError;

/// Application errors wrap domain and store errors and add
/// application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("config error: {message}")]
    Config { message: String },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
