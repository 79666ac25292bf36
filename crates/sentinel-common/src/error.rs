//! Error types for shared domain parsing.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while parsing domain values (names, dates, filenames).
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Unknown index name: {0} (expected one of EVI, NDMI, NDWI, NDVI)")]
    UnknownIndex(String),

    #[error("Unknown band role: {0}")]
    UnknownBandRole(String),

    #[error("Invalid band code: {0:?}")]
    InvalidBandCode(String),

    #[error("Invalid date '{value}': {message}")]
    InvalidDate { value: String, message: String },

    #[error("Malformed file name '{name}': {message}")]
    MalformedFileName { name: String, message: String },

    #[error("Grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

impl CommonError {
    pub fn malformed_file_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedFileName {
            name: name.into(),
            message: message.into(),
        }
    }
}
