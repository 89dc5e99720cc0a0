//! Error types for the shared field model.

use thiserror::Error;

/// Result type alias using FieldError.
pub type FieldResult<T> = Result<T, FieldError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Invalid cycle label: {0}")]
    InvalidCycle(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid timestep file name: {0}")]
    InvalidFileStem(String),
}
