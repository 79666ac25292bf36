//! Sentinel-2 index product pipeline.
//!
//! Turns one imagery date's downloaded granule tree into clipped, reprojected
//! index tiles and one virtual mosaic per product.
//!
//! # Architecture
//!
//! For each configured product:
//!
//! - [`PathResolver`] maps every granule to its band files and tile path;
//!   granules missing a band are reported and left out
//! - [`TileCache`] skips granules whose tile already exists
//! - a [`RasterEngine`] loads the bands, band-math computes the index, and the
//!   engine materializes it in memory
//! - [`ClipReprojectStage`] warps it into the tile file
//! - [`MosaicBuilder`] references all tiles from one `.vrt`
//!
//! [`ProductPipeline`] drives this and always returns a [`RunReport`]; only
//! configuration errors stop a run.

pub mod cleanup;
pub mod config;
pub mod error;
pub mod mosaic;
pub mod paths;
pub mod pipeline;
pub mod raster;
pub mod tile_cache;
pub mod warp;

// Re-exports
pub use cleanup::{clear_intermediate_data, CleanupReport};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use mosaic::MosaicBuilder;
pub use paths::{IncompleteGranule, PathResolver, ProcessingPath, ResolvedBand, ResolvedPaths};
pub use pipeline::{
    FailureKind, FailureRecord, ProductPipeline, RunReport, TileCounters, TileFailure,
    TileOutcome, TileStage,
};
#[cfg(feature = "gdal")]
pub use raster::GdalEngine;
pub use raster::{Georeference, RasterBand, RasterEngine, WarpRequest};
pub use tile_cache::TileCache;
pub use warp::{normalize_crs, ClipReprojectStage};
