//! Sentinel-2 product processor.
//!
//! Loads the product configuration, runs the index pipeline for one imagery
//! date and announces every finished mosaic downstream.

pub mod config_loader;
pub mod logging;
pub mod publish;
pub mod runner;

pub use config_loader::{load_config, ProcessorConfig, PublishConfig};
pub use publish::{publish_all, publisher_for, HttpPublisher, LogPublisher, Publisher};
pub use runner::{run_date, RunOptions, RunOutcome};
