//! End-to-end run tests over a text-band engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use product_pipeline::{
    Georeference, PipelineError, RasterBand, RasterEngine, WarpRequest,
};
use product_processor::config_loader::load_config;
use product_processor::publish::Publisher;
use product_processor::runner::{run_date, RunOptions};
use sentinel_common::{Grid, ImageryDate, Product, DEFAULT_BAND_NODATA};
use test_utils::{read_text_band, sample_config_json, write_text_band, GranuleTree};

const DATE: &str = "20240115";

// ============================================================================
// Test doubles
// ============================================================================

/// Reads and writes the text band format instead of real rasters.
struct TextEngine;

impl RasterEngine for TextEngine {
    type Raster = Grid;

    fn load_band(&self, path: &Path) -> product_pipeline::Result<RasterBand> {
        let (data, columns, rows) =
            read_text_band(path).map_err(|e| PipelineError::band_open(path, e))?;
        Ok(RasterBand {
            pixels: Grid::new(data, columns, rows)?,
            columns,
            rows,
            band_count: 1,
            nodata: DEFAULT_BAND_NODATA,
            file_extension: "jp2".to_string(),
            driver_name: "TEXT".to_string(),
            georef: Georeference {
                geo_transform: [0.0, 10.0, 0.0, 0.0, 0.0, -10.0],
                projection: String::new(),
            },
            projection_ref: String::new(),
        })
    }

    fn materialize(&self, grid: &Grid, _georef: &Georeference) -> product_pipeline::Result<Grid> {
        Ok(grid.clone())
    }

    fn clip_reproject(&self, raster: &Grid, request: &WarpRequest) -> product_pipeline::Result<()> {
        let dst = &request.destination;
        write_text_band(dst, raster.width, raster.height, &raster.data)
            .map_err(|e| PipelineError::warp(dst, e))
    }

    fn build_mosaic(&self, mosaic: &Path, tiles: &[PathBuf]) -> product_pipeline::Result<()> {
        let listing: Vec<String> = tiles.iter().map(|t| t.display().to_string()).collect();
        fs::write(mosaic, listing.join("\n")).map_err(|e| PipelineError::mosaic(mosaic, e))
    }
}

#[derive(Default)]
struct RecordingPublisher {
    published: Mutex<Vec<Product>>,
    reject: Option<&'static str>,
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, product: &Product) -> Result<()> {
        if self.reject == Some(product.name.as_str()) {
            anyhow::bail!("rejected {}", product.name);
        }
        self.published.lock().unwrap().push(product.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn tree_with_one_granule() -> GranuleTree {
    let tree = GranuleTree::new(DATE);
    tree.add_granule(
        "S2A_MSIL2A_20240115T101321_N0510_R022_T32TQM_20240115T130000.SAFE",
        "T32TQM",
        "20240115T101321",
        "R10m",
        &[
            ("B03", vec![1000.0; 4]),
            ("B04", vec![2000.0; 4]),
            ("B08", vec![8000.0; 4]),
        ],
    );
    tree
}

fn pipeline_config(tree: &GranuleTree) -> product_pipeline::PipelineConfig {
    let json = sample_config_json(&tree.raw_input(), &tree.clipping_mask(), &tree.product_output());
    let path = tree.root().join("products.json");
    fs::write(&path, json).unwrap();
    load_config(&path).unwrap().pipeline_config(&[]).unwrap()
}

fn options(clear_intermediate: bool) -> RunOptions {
    RunOptions {
        date: DATE.parse::<ImageryDate>().unwrap(),
        clear_intermediate,
    }
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn test_run_publishes_every_mosaic() {
    let tree = tree_with_one_granule();
    let publisher = RecordingPublisher::default();

    let outcome = run_date(pipeline_config(&tree), &options(false), || Ok(TextEngine), &publisher)
        .await
        .unwrap();

    assert!(outcome.report.failures.is_empty(), "{:?}", outcome.report.failures);
    assert_eq!(outcome.report.tiles.computed, 2);
    assert_eq!(outcome.published.published, 2);

    let published = publisher.published.lock().unwrap();
    let names: Vec<&str> = published.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["NDVI", "NDWI"]);
    for product in published.iter() {
        assert_eq!(product.new_date.to_string(), DATE);
        assert!(product.mosaic_path.is_file());
        assert!(product.mosaic_path.starts_with(tree.output_folder(&product.name)));
    }
    // Raw data is left in place without --clear-intermediate
    assert!(tree.raw_input().join(DATE).is_dir());
}

#[tokio::test]
async fn test_publish_failure_does_not_fail_run() {
    let tree = tree_with_one_granule();
    let publisher = RecordingPublisher {
        reject: Some("NDVI"),
        ..Default::default()
    };

    let outcome = run_date(pipeline_config(&tree), &options(false), || Ok(TextEngine), &publisher)
        .await
        .unwrap();

    assert_eq!(outcome.published.published, 1);
    assert_eq!(outcome.published.failed, 1);
    assert_eq!(outcome.report.products.len(), 2);
}

#[tokio::test]
async fn test_clear_intermediate_removes_granules() {
    let tree = tree_with_one_granule();
    tree.add_file("raw/download.log", "done");
    let publisher = RecordingPublisher::default();

    let outcome = run_date(pipeline_config(&tree), &options(true), || Ok(TextEngine), &publisher)
        .await
        .unwrap();

    assert_eq!(outcome.report.products.len(), 2);
    assert!(!tree.raw_input().join(DATE).exists());
    assert!(tree.raw_input().join("download.log").is_file());
    // Products survive the cleanup
    assert!(tree.output_folder("NDVI").is_dir());
}

#[tokio::test]
async fn test_engine_construction_failure_is_error() {
    let tree = tree_with_one_granule();
    let publisher = RecordingPublisher::default();

    let result = run_date(
        pipeline_config(&tree),
        &options(false),
        || -> product_pipeline::Result<TextEngine> {
            Err(PipelineError::Materialization("no driver".to_string()))
        },
        &publisher,
    )
    .await;

    assert!(result.is_err());
    assert!(publisher.published.lock().unwrap().is_empty());
}
