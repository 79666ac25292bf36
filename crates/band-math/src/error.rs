//! Error types for index calculation.

use sentinel_common::{BandRole, IndexKind};
use thiserror::Error;

/// Errors that can occur while computing an index grid.
#[derive(Error, Debug)]
pub enum CalculationError {
    #[error("{index} needs band {role} but it was not supplied")]
    MissingBand { index: IndexKind, role: BandRole },

    #[error("band {role} is {actual:?} but {expected:?} was expected")]
    ShapeMismatch {
        role: BandRole,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("band {0} is empty")]
    EmptyBand(BandRole),
}

/// Result type for calculation operations.
pub type Result<T> = std::result::Result<T, CalculationError>;
