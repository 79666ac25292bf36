//! Error types for the product pipeline.

use std::path::PathBuf;

use band_math::CalculationError;
use sentinel_common::CommonError;
use thiserror::Error;

/// Errors that can occur while producing tiles and mosaics.
///
/// Everything except [`PipelineError::Config`] is recovered by the
/// orchestrator: logged, and the affected tile or product skipped.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to list granules under {path}: {message}")]
    GranuleListing { path: PathBuf, message: String },

    #[error("Failed to open band {path}: {message}")]
    BandOpen { path: PathBuf, message: String },

    #[error("Index calculation failed: {0}")]
    Calculation(#[from] CalculationError),

    #[error("Failed to build in-memory raster: {0}")]
    Materialization(String),

    #[error("Clip/reproject to {path} failed: {message}")]
    Warp { path: PathBuf, message: String },

    #[error("Mosaic {path} failed: {message}")]
    Mosaic { path: PathBuf, message: String },

    #[error("No tiles to mosaic for {product}")]
    EmptyMosaic { product: String },

    #[error("{0}")]
    Naming(#[from] CommonError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn listing(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::GranuleListing {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn band_open(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::BandOpen {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn warp(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Warp {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn mosaic(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Mosaic {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
