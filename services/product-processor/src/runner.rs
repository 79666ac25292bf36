//! One processing run: pipeline, publication, optional raw-data cleanup.

use anyhow::{Context, Result};
use product_pipeline::{
    clear_intermediate_data, PipelineConfig, ProductPipeline, RasterEngine, RunReport,
};
use sentinel_common::ImageryDate;
use tracing::{error, info, warn, Span};

use crate::publish::{publish_all, PublishSummary, Publisher};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub date: ImageryDate,
    /// Remove the sub-directories of `rawInput` once the run is done
    pub clear_intermediate: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    pub published: PublishSummary,
}

/// Run the pipeline for one date, then announce every finished product.
///
/// The pipeline is blocking (GDAL and subprocesses), so it runs on the
/// blocking pool with an engine built there by `make_engine`.
pub async fn run_date<E, F>(
    config: PipelineConfig,
    options: &RunOptions,
    make_engine: F,
    publisher: &dyn Publisher,
) -> Result<RunOutcome>
where
    E: RasterEngine,
    F: FnOnce() -> product_pipeline::Result<E> + Send + 'static,
{
    let date = options.date;
    let raw_input = config.raw_input.clone();
    let span = Span::current();

    let report = tokio::task::spawn_blocking(move || -> product_pipeline::Result<RunReport> {
        let _entered = span.enter();
        let pipeline = ProductPipeline::new(config, make_engine()?)?;
        Ok(pipeline.run(date))
    })
    .await
    .context("Pipeline task aborted")??;

    info!(
        products = report.products.len(),
        failures = report.failures.len(),
        computed = report.tiles.computed,
        cached = report.tiles.cached,
        failed = report.tiles.failed,
        incomplete = report.tiles.incomplete,
        "Pipeline run finished"
    );

    let published = publish_all(publisher, &report.products).await;
    if published.failed > 0 {
        warn!(
            published = published.published,
            failed = published.failed,
            "Some products were not published"
        );
    }

    if options.clear_intermediate {
        match clear_intermediate_data(&raw_input) {
            Ok(cleanup) => info!(
                removed = cleanup.removed,
                skipped = cleanup.skipped,
                path = %raw_input.display(),
                "Cleared intermediate data"
            ),
            Err(e) => error!(
                path = %raw_input.display(),
                error = %e,
                "Failed to clear intermediate data"
            ),
        }
    }

    Ok(RunOutcome { report, published })
}
