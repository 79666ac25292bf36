//! Tracing setup for the processor binary.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Unknown names fall back to `INFO`.
pub fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber, writing to stdout or appending to
/// `log_file`.
pub fn init_tracing(level: Level, format: LogFormat, log_file: Option<&Path>) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    match (format, log_file) {
        (LogFormat::Json, None) => {
            tracing::subscriber::set_global_default(builder.json().finish())?;
        }
        (LogFormat::Pretty, None) => {
            tracing::subscriber::set_global_default(builder.pretty().finish())?;
        }
        (LogFormat::Json, Some(path)) => {
            let writer = Mutex::new(open_log_file(path)?);
            tracing::subscriber::set_global_default(builder.json().with_writer(writer).finish())?;
        }
        (LogFormat::Pretty, Some(path)) => {
            let writer = Mutex::new(open_log_file(path)?);
            let subscriber = builder.pretty().with_ansi(false).with_writer(writer).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {:?}", path))
}
