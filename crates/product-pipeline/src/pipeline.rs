//! Product orchestration: resolve, tile, mosaic, report.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use band_math::{calculator_for, BandSet, IndexCalculator, IndexStats};
use sentinel_common::{ImageryDate, Product, ProductSpec};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::mosaic::MosaicBuilder;
use crate::paths::{PathResolver, ProcessingPath};
use crate::raster::{RasterBand, RasterEngine};
use crate::tile_cache::TileCache;
use crate::warp::ClipReprojectStage;

/// Progress of one tile through the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TileStage {
    NotComputed,
    BandsLoaded,
    IndexComputed,
    Materialized,
    OnDisk,
}

impl fmt::Display for TileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TileStage::NotComputed => "not_computed",
            TileStage::BandsLoaded => "bands_loaded",
            TileStage::IndexComputed => "index_computed",
            TileStage::Materialized => "materialized",
            TileStage::OnDisk => "on_disk",
        };
        f.write_str(s)
    }
}

/// How a tile ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileOutcome {
    Computed(PathBuf),
    Cached(PathBuf),
}

impl TileOutcome {
    pub fn path(&self) -> &PathBuf {
        match self {
            TileOutcome::Computed(p) | TileOutcome::Cached(p) => p,
        }
    }
}

/// A tile that did not reach disk.
#[derive(Debug)]
pub struct TileFailure {
    pub granule_index: usize,
    pub tile: PathBuf,
    /// Last stage reached before the error
    pub stage: TileStage,
    pub error: PipelineError,
}

/// Which step of a product failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Resolution,
    Tile,
    Mosaic,
}

/// One logged failure, kept for the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub product: String,
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granule_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<TileStage>,
    pub message: String,
}

/// Tile tallies across all products of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TileCounters {
    pub computed: usize,
    pub cached: usize,
    pub failed: usize,
    pub incomplete: usize,
}

/// Result of one run. Always produced, whatever failed along the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub date: ImageryDate,
    /// Products whose mosaic was built, in processing order
    pub products: Vec<Product>,
    pub failures: Vec<FailureRecord>,
    pub tiles: TileCounters,
}

impl RunReport {
    pub fn new(date: ImageryDate) -> Self {
        Self {
            date,
            products: Vec::new(),
            failures: Vec::new(),
            tiles: TileCounters::default(),
        }
    }

    fn fail(&mut self, product: &str, kind: FailureKind, message: impl ToString) {
        self.failures.push(FailureRecord {
            product: product.to_string(),
            kind,
            granule_index: None,
            stage: None,
            message: message.to_string(),
        });
    }

    fn fail_tile(&mut self, product: &str, failure: &TileFailure) {
        self.tiles.failed += 1;
        self.failures.push(FailureRecord {
            product: product.to_string(),
            kind: FailureKind::Tile,
            granule_index: Some(failure.granule_index),
            stage: Some(failure.stage),
            message: failure.error.to_string(),
        });
    }
}

/// Drives every configured product through the tile chain and into a mosaic.
///
/// Strictly sequential: one product, one granule, one band at a time.
pub struct ProductPipeline<E: RasterEngine> {
    config: PipelineConfig,
    engine: E,
    resolver: PathResolver,
    cache: TileCache,
    warp: ClipReprojectStage,
}

impl<E: RasterEngine> ProductPipeline<E> {
    /// Validate `config` and build a pipeline around `engine`.
    pub fn new(config: PipelineConfig, engine: E) -> crate::Result<Self> {
        config.validate()?;
        let resolver = PathResolver::new(&config.raw_input, &config.product_output);
        let warp = ClipReprojectStage::new(&config.clipping_mask, &config.out_crs);
        Ok(Self {
            config,
            engine,
            resolver,
            cache: TileCache::new(),
            warp,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Process every configured product for `date`.
    #[instrument(skip(self), fields(date = %date))]
    pub fn run(&self, date: ImageryDate) -> RunReport {
        let mut report = RunReport::new(date);
        info!(products = self.config.products.len(), "Starting product run");

        for spec in &self.config.products {
            if let Some(product) = self.run_product(spec, date, &mut report) {
                report.products.push(product);
            }
        }

        info!(
            produced = report.products.len(),
            failures = report.failures.len(),
            computed = report.tiles.computed,
            cached = report.tiles.cached,
            failed = report.tiles.failed,
            incomplete = report.tiles.incomplete,
            "Product run finished"
        );
        report
    }

    /// Tile and mosaic one product. Returns it when a mosaic was built.
    #[instrument(skip(self, spec, report), fields(product = %spec.name(), id = %spec.id))]
    fn run_product(
        &self,
        spec: &ProductSpec,
        date: ImageryDate,
        report: &mut RunReport,
    ) -> Option<Product> {
        let product = spec.name();

        let resolved = match self.resolver.resolve(spec, date) {
            Ok(resolved) => resolved,
            Err(e) => {
                error!(product = %product, error = %e, "Path resolution failed, skipping product");
                report.fail(product, FailureKind::Resolution, &e);
                return None;
            }
        };
        report.tiles.incomplete += resolved.incomplete.len();

        info!(
            product = %product,
            granules = resolved.complete.len(),
            incomplete = resolved.incomplete.len(),
            "Resolved granules"
        );

        let folders: BTreeSet<&PathBuf> =
            resolved.complete.iter().map(|p| &p.output_folder).collect();
        for folder in folders {
            if let Err(e) = fs::create_dir_all(folder) {
                error!(path = %folder.display(), error = %e, "Failed to create output folder");
            }
        }

        let calculator = calculator_for(spec.index);
        let mut tiles = Vec::with_capacity(resolved.complete.len());

        for path in &resolved.complete {
            match self.process_tile(calculator, path) {
                Ok(TileOutcome::Computed(tile)) => {
                    report.tiles.computed += 1;
                    tiles.push(tile);
                }
                Ok(TileOutcome::Cached(tile)) => {
                    report.tiles.cached += 1;
                    tiles.push(tile);
                }
                Err(failure) => {
                    error!(
                        product = %product,
                        granule = failure.granule_index,
                        path = %failure.tile.display(),
                        stage = %failure.stage,
                        error = %failure.error,
                        "Tile failed, skipping"
                    );
                    report.fail_tile(product, &failure);
                }
            }
        }

        let folder = self.resolver.output_folder(spec, date);
        match MosaicBuilder::build(&self.engine, product, &folder, &tiles) {
            Ok(mosaic_path) => Some(Product {
                name: product.to_string(),
                new_date: date,
                mosaic_path,
            }),
            Err(e) => {
                error!(product = %product, error = %e, "Mosaic failed, product not published");
                report.fail(product, FailureKind::Mosaic, &e);
                None
            }
        }
    }

    /// Run the chain for one granule, short-circuiting on an existing tile.
    #[instrument(
        skip(self, calculator, path),
        fields(granule = path.granule_index, tile = %path.output_file_name)
    )]
    fn process_tile(
        &self,
        calculator: &dyn IndexCalculator,
        path: &ProcessingPath,
    ) -> Result<TileOutcome, TileFailure> {
        let destination = path.output_path();
        if self.cache.contains(&destination) {
            debug!(path = %destination.display(), "Tile exists, skipping");
            return Ok(TileOutcome::Cached(destination));
        }

        let fail = |stage: TileStage, error: PipelineError| TileFailure {
            granule_index: path.granule_index,
            tile: destination.clone(),
            stage,
            error,
        };

        let mut loaded: Vec<RasterBand> = Vec::with_capacity(path.bands.len());
        for band in &path.bands {
            let raster = self
                .engine
                .load_band(&band.path)
                .map_err(|e| fail(TileStage::NotComputed, e))?;
            debug!(
                role = %band.role,
                path = %band.path.display(),
                columns = raster.columns,
                rows = raster.rows,
                driver = %raster.driver_name,
                "Loaded band"
            );
            loaded.push(raster);
        }

        let Some(reference) = loaded.first() else {
            return Err(fail(
                TileStage::NotComputed,
                PipelineError::Config("product has no bands".to_string()),
            ));
        };

        let mut bands = BandSet::new();
        for (resolved, raster) in path.bands.iter().zip(&loaded) {
            bands.insert(resolved.role, &raster.pixels);
        }
        let grid = calculator
            .compute(&bands)
            .map_err(|e| fail(TileStage::BandsLoaded, e.into()))?;

        let stats = IndexStats::from_grid(&grid);
        debug!(
            valid = stats.valid,
            nodata = stats.nodata,
            min = ?stats.min,
            max = ?stats.max,
            "Computed index"
        );
        if stats.valid == 0 {
            warn!(path = %destination.display(), "Tile has no valid pixels");
        }

        let raster = self
            .engine
            .materialize(&grid, &reference.georef)
            .map_err(|e| fail(TileStage::IndexComputed, e))?;

        self.warp
            .run(&self.engine, &raster, &destination)
            .map_err(|e| fail(TileStage::Materialized, e))?;

        info!(path = %destination.display(), "Tile written");
        Ok(TileOutcome::Computed(destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert!(TileStage::NotComputed < TileStage::BandsLoaded);
        assert!(TileStage::Materialized < TileStage::OnDisk);
        assert_eq!(TileStage::IndexComputed.to_string(), "index_computed");
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let mut report = RunReport::new("20240115".parse().unwrap());
        report.fail("NDVI", FailureKind::Mosaic, "no tiles");
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"date\":\"20240115\""));
        assert!(json.contains("\"kind\":\"mosaic\""));
        assert!(!json.contains("granuleIndex"));
    }
}
