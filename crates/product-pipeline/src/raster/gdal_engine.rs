//! Raster engine backed by libgdal and the GDAL command-line tools.
//!
//! Band reads and the in-memory raster go through the `gdal` crate. Warping
//! and mosaics shell out to `gdalwarp` and `gdalbuildvrt`, which must be on
//! `PATH`.

use std::path::{Path, PathBuf};
use std::process::Command;

use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{Dataset, DriverManager};
use sentinel_common::{Grid, DEFAULT_BAND_NODATA, INDEX_NODATA};
use tempfile::TempDir;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::mosaic::gdalbuildvrt_args;
use crate::raster::{Georeference, RasterBand, RasterEngine, WarpRequest};
use crate::warp::gdalwarp_args;

const MEM_DRIVER: &str = "MEM";
const GTIFF_DRIVER: &str = "GTiff";

/// Production [`RasterEngine`].
///
/// In-memory rasters are spilled to a private scratch directory for
/// `gdalwarp`; the directory is removed when the engine is dropped.
pub struct GdalEngine {
    scratch: TempDir,
}

impl GdalEngine {
    pub fn new() -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("sentinel_warp_")
            .tempdir()?;
        Ok(Self { scratch })
    }

    fn spill_path(&self, destination: &Path) -> PathBuf {
        let stem = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "raster".to_string());
        self.scratch.path().join(format!("{}.src.tif", stem))
    }
}

impl RasterEngine for GdalEngine {
    type Raster = Dataset;

    fn load_band(&self, path: &Path) -> Result<RasterBand> {
        let open_err = |e: gdal::errors::GdalError| PipelineError::band_open(path, e);

        let dataset = Dataset::open(path).map_err(open_err)?;
        let (columns, rows) = dataset.raster_size();
        let band_count = dataset.raster_count() as usize;

        let band = dataset.rasterband(1).map_err(open_err)?;
        let nodata = band.no_data_value().unwrap_or(DEFAULT_BAND_NODATA);
        let buffer = band
            .read_as::<f32>((0, 0), (columns, rows), (columns, rows), None)
            .map_err(open_err)?;
        let pixels = Grid::new(buffer.data().to_vec(), columns, rows)
            .map_err(|e| PipelineError::band_open(path, e))?;

        let geo_transform = dataset.geo_transform().map_err(open_err)?;
        let projection = dataset.projection();
        let driver_name = dataset.driver().short_name();
        let file_extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(RasterBand {
            pixels,
            columns,
            rows,
            band_count,
            nodata,
            file_extension,
            driver_name,
            georef: Georeference {
                geo_transform,
                projection: projection.clone(),
            },
            projection_ref: projection,
        })
    }

    fn materialize(&self, grid: &Grid, georef: &Georeference) -> Result<Dataset> {
        let mat_err = |e: gdal::errors::GdalError| PipelineError::Materialization(e.to_string());

        let driver = DriverManager::get_driver_by_name(MEM_DRIVER).map_err(mat_err)?;
        let mut dataset = driver
            .create_with_band_type::<f32, _>("", grid.width, grid.height, 1)
            .map_err(mat_err)?;
        dataset
            .set_geo_transform(&georef.geo_transform)
            .map_err(mat_err)?;
        if !georef.projection.is_empty() {
            dataset.set_projection(&georef.projection).map_err(mat_err)?;
        }

        {
            let mut band = dataset.rasterband(1).map_err(mat_err)?;
            let mut buffer = Buffer::new((grid.width, grid.height), grid.data.clone());
            band.write((0, 0), (grid.width, grid.height), &mut buffer)
                .map_err(mat_err)?;
            band.set_no_data_value(Some(INDEX_NODATA as f64))
                .map_err(mat_err)?;
        }

        Ok(dataset)
    }

    fn clip_reproject(&self, raster: &Dataset, request: &WarpRequest) -> Result<()> {
        let warp_err = |e: String| PipelineError::warp(&request.destination, e);

        let source = self.spill_path(&request.destination);
        let driver = DriverManager::get_driver_by_name(GTIFF_DRIVER)
            .map_err(|e| warp_err(e.to_string()))?;
        let spilled = raster
            .create_copy(&driver, &source, &RasterCreationOptions::new())
            .map_err(|e| warp_err(e.to_string()))?;
        // Close the copy so it is flushed before gdalwarp reads it.
        drop(spilled);

        let result = run_tool("gdalwarp", &gdalwarp_args(&source, request)).map_err(warp_err);
        if let Err(e) = std::fs::remove_file(&source) {
            debug!(path = %source.display(), error = %e, "Failed to remove spilled raster");
        }
        result
    }

    fn build_mosaic(&self, mosaic: &Path, tiles: &[PathBuf]) -> Result<()> {
        run_tool("gdalbuildvrt", &gdalbuildvrt_args(mosaic, tiles))
            .map_err(|e| PipelineError::mosaic(mosaic, e))
    }
}

/// Run a GDAL utility to completion, returning its stderr on failure.
fn run_tool(program: &str, args: &[String]) -> std::result::Result<(), String> {
    debug!(program = %program, args = ?args, "Running GDAL utility");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| format!("{} could not be started: {}", program, e))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}
