//! Common helpers for product-pipeline integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use product_pipeline::{
    Georeference, PipelineConfig, PipelineError, RasterBand, RasterEngine, Result, WarpRequest,
};
use sentinel_common::{BandCode, BandRole, Grid, IndexKind, ProductSpec};
use test_utils::{read_text_band, write_text_band, GranuleTree};

pub const DATE: &str = "20240115";

/// In-memory raster of the fake engine.
#[derive(Debug, Clone)]
pub struct FakeRaster {
    pub grid: Grid,
    pub georef: Georeference,
}

/// Raster engine over the text band format that records every call.
#[derive(Default)]
pub struct RecordingEngine {
    pub loaded: RefCell<Vec<PathBuf>>,
    pub materialized: Cell<usize>,
    pub warps: RefCell<Vec<WarpRequest>>,
    pub mosaics: RefCell<Vec<(PathBuf, Vec<PathBuf>)>>,
    /// Warps whose final tile name contains one of these fail without output
    pub fail_warp: RefCell<BTreeSet<String>>,
    /// Warps whose final tile name contains one of these write a partial file, then fail
    pub partial_warp: RefCell<BTreeSet<String>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_warp_for(self, needle: &str) -> Self {
        self.fail_warp.borrow_mut().insert(needle.to_string());
        self
    }

    pub fn partial_warp_for(self, needle: &str) -> Self {
        self.partial_warp.borrow_mut().insert(needle.to_string());
        self
    }

    pub fn load_count(&self) -> usize {
        self.loaded.borrow().len()
    }

    pub fn warp_count(&self) -> usize {
        self.warps.borrow().len()
    }

    pub fn mosaic_count(&self) -> usize {
        self.mosaics.borrow().len()
    }

    fn matches(set: &RefCell<BTreeSet<String>>, destination: &Path) -> bool {
        let name = destination.to_string_lossy();
        set.borrow().iter().any(|needle| name.contains(needle.as_str()))
    }
}

impl RasterEngine for RecordingEngine {
    type Raster = FakeRaster;

    fn load_band(&self, path: &Path) -> Result<RasterBand> {
        self.loaded.borrow_mut().push(path.to_path_buf());
        let (data, columns, rows) =
            read_text_band(path).map_err(|e| PipelineError::band_open(path, e))?;
        let pixels = Grid::new(data, columns, rows)?;
        Ok(RasterBand {
            pixels,
            columns,
            rows,
            band_count: 1,
            nodata: sentinel_common::DEFAULT_BAND_NODATA,
            file_extension: "jp2".to_string(),
            driver_name: "TEXT".to_string(),
            georef: Georeference {
                geo_transform: [500000.0, 10.0, 0.0, 5000000.0, 0.0, -10.0],
                projection: "LOCAL_CS[\"test\"]".to_string(),
            },
            projection_ref: "LOCAL_CS[\"test\"]".to_string(),
        })
    }

    fn materialize(&self, grid: &Grid, georef: &Georeference) -> Result<FakeRaster> {
        self.materialized.set(self.materialized.get() + 1);
        Ok(FakeRaster {
            grid: grid.clone(),
            georef: georef.clone(),
        })
    }

    fn clip_reproject(&self, raster: &FakeRaster, request: &WarpRequest) -> Result<()> {
        self.warps.borrow_mut().push(request.clone());
        let dst = &request.destination;

        if Self::matches(&self.partial_warp, dst) {
            fs::write(dst, b"partial").map_err(|e| PipelineError::warp(dst, e))?;
            return Err(PipelineError::warp(dst, "simulated crash mid-write"));
        }
        if Self::matches(&self.fail_warp, dst) {
            return Err(PipelineError::warp(dst, "simulated warp failure"));
        }

        write_text_band(dst, raster.grid.width, raster.grid.height, &raster.grid.data)
            .map_err(|e| PipelineError::warp(dst, e))
    }

    fn build_mosaic(&self, mosaic: &Path, tiles: &[PathBuf]) -> Result<()> {
        self.mosaics
            .borrow_mut()
            .push((mosaic.to_path_buf(), tiles.to_vec()));
        let listing: Vec<String> = tiles.iter().map(|t| t.display().to_string()).collect();
        fs::write(mosaic, listing.join("\n")).map_err(|e| PipelineError::mosaic(mosaic, e))
    }
}

/// Tile paths listed in a mosaic written by [`RecordingEngine`].
pub fn read_mosaic(path: &Path) -> Vec<PathBuf> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(PathBuf::from)
        .collect()
}

pub fn spec(index: IndexKind, resolution: &str) -> ProductSpec {
    let bands: BTreeMap<BandRole, BandCode> = index
        .required_roles()
        .iter()
        .map(|role| (*role, BandCode::new(role.default_code()).unwrap()))
        .collect();
    ProductSpec {
        id: index.name().to_lowercase(),
        index,
        resolution: resolution.to_string(),
        bands,
    }
}

pub fn config(tree: &GranuleTree, products: Vec<ProductSpec>) -> PipelineConfig {
    PipelineConfig {
        raw_input: tree.raw_input(),
        clipping_mask: tree.clipping_mask(),
        out_crs: "3857".to_string(),
        product_output: tree.product_output(),
        products,
    }
}

/// NIR and RED bands giving NDVI 0.6 everywhere on a 2x2 grid.
pub fn ndvi_bands() -> Vec<(&'static str, Vec<f32>)> {
    vec![("B08", vec![8000.0; 4]), ("B04", vec![2000.0; 4])]
}

/// Every default-coded band, so any index can be computed.
pub fn all_bands() -> Vec<(&'static str, Vec<f32>)> {
    vec![
        ("B02", vec![500.0; 4]),
        ("B03", vec![1500.0; 4]),
        ("B04", vec![1000.0; 4]),
        ("B08", vec![4000.0; 4]),
        ("B8A", vec![3000.0; 4]),
        ("B11", vec![1000.0; 4]),
    ]
}
