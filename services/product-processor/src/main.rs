//! Sentinel-2 product processor service.
//!
//! Computes spectral index tiles for every granule downloaded for one date,
//! assembles them into per-product mosaics and publishes the new date.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use product_processor::config_loader::load_config;
use product_processor::logging::{init_tracing, parse_level, LogFormat};
use product_processor::publish::publisher_for;
use product_processor::runner::{run_date, RunOptions};
use sentinel_common::ImageryDate;

#[derive(Parser, Debug)]
#[command(name = "product-processor")]
#[command(about = "Sentinel-2 spectral index products for one imagery date")]
struct Args {
    /// Product configuration file (JSON or YAML)
    #[arg(short, long, env = "SENTINEL_CONFIG", default_value = "config/sentinel2_products.json")]
    config: PathBuf,

    /// Imagery date to process (YYYYMMDD)
    #[arg(short, long)]
    date: ImageryDate,

    /// Product id to process (repeatable, default: all configured)
    #[arg(short, long = "product")]
    products: Vec<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Append logs to <productOutput>/<today>_sentinel-2.log instead of stdout
    #[arg(long)]
    log_file: bool,

    /// Log finished products instead of notifying the publish endpoint
    #[arg(long)]
    no_publish: bool,

    /// Delete the downloaded granule directories after the run
    #[arg(long)]
    clear_intermediate: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = load_config(&args.config)?;

    let log_file = args
        .log_file
        .then(|| config.log_file_path(Local::now().date_naive()));
    init_tracing(
        parse_level(&args.log_level),
        args.log_format,
        log_file.as_deref(),
    )?;

    let pipeline_config = config.pipeline_config(&args.products)?;
    info!(
        config = %args.config.display(),
        products = ?pipeline_config.products.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        out_crs = %pipeline_config.out_crs,
        "Loaded configuration"
    );

    let publisher = publisher_for(config.publish.as_ref(), args.no_publish)?;
    let options = RunOptions {
        date: args.date,
        clear_intermediate: args.clear_intermediate,
    };

    let span = info_span!("run", run_id = %Uuid::new_v4(), date = %args.date);
    let outcome = run_date(
        pipeline_config,
        &options,
        product_pipeline::GdalEngine::new,
        publisher.as_ref(),
    )
    .instrument(span)
    .await?;

    info!(
        date = %outcome.report.date,
        products = outcome.report.products.len(),
        failures = outcome.report.failures.len(),
        published = outcome.published.published,
        "Processing complete"
    );

    Ok(())
}
