//! Configuration loader for the product processor.
//!
//! Reads the product configuration from JSON (`.json`) or YAML (`.yaml`,
//! `.yml`):
//!
//! ```json
//! {
//!   "script": { "rawInput": "...", "clippingMask": "...", "outEPSG": "3857", "productOutput": "..." },
//!   "products": { "ndvi": { "name": "NDVI", "resolution": "R10m", "bands": { "NIR": "B08", "RED": "B04" } } },
//!   "publish": { "url": "https://...", "endPoint": "/api/dates", "token": "${PUBLISH_TOKEN}" }
//! }
//! ```
//!
//! Supports environment variable substitution using `${VAR}` and
//! `${VAR:-default}` syntax, and `~`/`$VAR` expansion in paths.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use product_pipeline::PipelineConfig;
use sentinel_common::{BandCode, BandRole, IndexKind, ProductSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of the per-day log file written under `productOutput`.
pub const LOG_FILE_SUFFIX: &str = "sentinel-2.log";

// ============================================================================
// Configuration file
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    pub script: ScriptConfig,
    pub products: BTreeMap<String, ProductConfig>,
    #[serde(default)]
    pub publish: Option<PublishConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptConfig {
    pub raw_input: String,
    pub clipping_mask: String,
    #[serde(rename = "outEPSG")]
    pub out_epsg: CrsValue,
    pub product_output: String,
}

/// Target CRS as written in the file: `"EPSG:3857"`, `"3857"` or `3857`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CrsValue {
    Code(u32),
    Text(String),
}

impl fmt::Display for CrsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrsValue::Code(code) => write!(f, "{}", code),
            CrsValue::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub name: IndexKind,
    pub resolution: String,
    pub bands: BTreeMap<BandRole, BandCode>,
}

/// Downstream notification endpoint.
///
/// Every field besides `url` and `endPoint` is sent along as a form field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    pub url: String,
    #[serde(rename = "endPoint")]
    pub end_point: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PublishConfig {
    /// `url` followed directly by `endPoint`.
    pub fn resource(&self) -> String {
        format!("{}{}", self.url, self.end_point)
    }
}

impl ProcessorConfig {
    /// Build the pipeline configuration, keeping only the product ids in
    /// `only` when it is non-empty.
    pub fn pipeline_config(&self, only: &[String]) -> Result<PipelineConfig> {
        for id in only {
            anyhow::ensure!(
                self.products.contains_key(id),
                "Unknown product id: {}. Configured: {:?}",
                id,
                self.products.keys().collect::<Vec<_>>()
            );
        }

        let products = self
            .products
            .iter()
            .filter(|(id, _)| only.is_empty() || only.contains(*id))
            .map(|(id, product)| ProductSpec {
                id: id.clone(),
                index: product.name,
                resolution: product.resolution.clone(),
                bands: product.bands.clone(),
            })
            .collect();

        let config = PipelineConfig {
            raw_input: PathBuf::from(&self.script.raw_input),
            clipping_mask: PathBuf::from(&self.script.clipping_mask),
            out_crs: self.script.out_epsg.to_string(),
            product_output: PathBuf::from(&self.script.product_output),
            products,
        };
        config.validate()?;
        Ok(config)
    }

    /// `<productOutput>/<YYYYMMDD>_sentinel-2.log` for `day`.
    pub fn log_file_path(&self, day: NaiveDate) -> PathBuf {
        Path::new(&self.script.product_output)
            .join(format!("{}_{}", day.format("%Y%m%d"), LOG_FILE_SUFFIX))
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load, expand and validate a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ProcessorConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read product config from {:?}", path))?;

    let expanded = expand_env_vars(&content)?;

    let mut config: ProcessorConfig = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&expanded)
            .with_context(|| format!("Failed to parse product config YAML from {:?}", path))?,
        _ => serde_json::from_str(&expanded)
            .with_context(|| format!("Failed to parse product config JSON from {:?}", path))?,
    };

    config.script.raw_input = expand_path(&config.script.raw_input)?;
    config.script.clipping_mask = expand_path(&config.script.clipping_mask)?;
    config.script.product_output = expand_path(&config.script.product_output)?;

    validate_config(&config)?;

    Ok(config)
}

/// Expand `~` and `$VAR` in a path value.
fn expand_path(value: &str) -> Result<String> {
    shellexpand::full(value)
        .map(|s| s.into_owned())
        .with_context(|| format!("Failed to expand path {:?}", value))
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in configuration content.
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            let value = resolve_var_expr(&var_expr)?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_config(config: &ProcessorConfig) -> Result<()> {
    let script = &config.script;
    anyhow::ensure!(!script.raw_input.is_empty(), "script.rawInput cannot be empty");
    anyhow::ensure!(
        !script.clipping_mask.is_empty(),
        "script.clippingMask cannot be empty"
    );
    anyhow::ensure!(
        !script.product_output.is_empty(),
        "script.productOutput cannot be empty"
    );
    anyhow::ensure!(
        !script.out_epsg.to_string().trim().is_empty(),
        "script.outEPSG cannot be empty"
    );
    anyhow::ensure!(!config.products.is_empty(), "No products configured");

    for (id, product) in &config.products {
        let missing: Vec<String> = product
            .name
            .required_roles()
            .iter()
            .filter(|role| !product.bands.contains_key(role))
            .map(|role| role.to_string())
            .collect();
        anyhow::ensure!(
            missing.is_empty(),
            "Product {} ({}) has no band code for: {}",
            id,
            product.name,
            missing.join(", ")
        );
    }

    if let Some(publish) = &config.publish {
        anyhow::ensure!(!publish.url.is_empty(), "publish.url cannot be empty");
    }

    Ok(())
}
