//! Raster I/O seam.
//!
//! The pipeline decides *when* to read a band, build a raster, warp it and
//! build a mosaic. A [`RasterEngine`] decides *how*. The production engine
//! ([`GdalEngine`], feature `gdal`) uses libgdal for band I/O and the GDAL
//! command-line utilities for warping and mosaics.

#[cfg(feature = "gdal")]
mod gdal_engine;

#[cfg(feature = "gdal")]
pub use gdal_engine::GdalEngine;

use std::path::{Path, PathBuf};

use sentinel_common::Grid;

use crate::error::Result;

/// Affine transform and coordinate system of a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Georeference {
    /// GDAL-order geotransform
    pub geo_transform: [f64; 6],
    /// Projection as WKT
    pub projection: String,
}

/// One band read from disk, with the metadata needed to write a derived raster.
///
/// Holds plain values only; the source file is closed by the time this exists.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBand {
    pub pixels: Grid,
    pub columns: usize,
    pub rows: usize,
    pub band_count: usize,
    /// Declared no-data, or [`DEFAULT_BAND_NODATA`](sentinel_common::DEFAULT_BAND_NODATA)
    pub nodata: f64,
    pub file_extension: String,
    pub driver_name: String,
    pub georef: Georeference,
    /// Projection reference WKT as reported by the driver
    pub projection_ref: String,
}

/// Parameters of one clip-and-reproject run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarpRequest {
    /// Cutline geometry
    pub mask: PathBuf,
    /// Normalized target CRS (`EPSG:<code>` or any string gdalwarp accepts)
    pub target_crs: String,
    /// File the warp writes
    pub destination: PathBuf,
}

/// Band I/O, in-memory rasters, warping and mosaics.
pub trait RasterEngine {
    /// In-memory raster produced by [`materialize`](Self::materialize).
    type Raster;

    /// Read band 1 of `path` as `f32`.
    fn load_band(&self, path: &Path) -> Result<RasterBand>;

    /// Wrap a computed grid in a single-band raster with `georef` and
    /// [`INDEX_NODATA`](sentinel_common::INDEX_NODATA) as its no-data value.
    fn materialize(&self, grid: &Grid, georef: &Georeference) -> Result<Self::Raster>;

    /// Clip `raster` to the mask, reproject it and write `request.destination`.
    fn clip_reproject(&self, raster: &Self::Raster, request: &WarpRequest) -> Result<()>;

    /// Write a virtual mosaic at `mosaic` referencing `tiles` in order,
    /// replacing any existing mosaic.
    fn build_mosaic(&self, mosaic: &Path, tiles: &[PathBuf]) -> Result<()>;
}
