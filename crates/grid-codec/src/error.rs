//! Error types for grid normalization.

use thiserror::Error;

/// Errors that can occur while wrapping, encoding or decoding a grid.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A source field did not have the expected shape.
    #[error("expected grid shape {expected:?}, got {actual:?}")]
    Shape {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// An encoded buffer had the wrong length.
    #[error("expected {expected} encoded bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The source GRIB message could not be decoded.
    #[error("GRIB decode failed: {0}")]
    Grib(String),
}

impl CodecError {
    /// Create a Grib error.
    pub fn grib(msg: impl Into<String>) -> Self {
        Self::Grib(msg.into())
    }
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
