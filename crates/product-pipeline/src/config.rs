//! Validated run configuration handed to the orchestrator.
//!
//! File formats and environment expansion live in the service; this crate
//! only sees the resolved values.

use std::path::PathBuf;

use sentinel_common::ProductSpec;

use crate::error::{PipelineError, Result};

/// Everything one run needs besides the imagery date.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the downloaded per-date granule trees
    pub raw_input: PathBuf,
    /// AOI geometry passed to the warp as a cutline
    pub clipping_mask: PathBuf,
    /// Target CRS, `EPSG:<code>` or bare digits
    pub out_crs: String,
    /// Root for tiles and mosaics
    pub product_output: PathBuf,
    /// Products in processing order
    pub products: Vec<ProductSpec>,
}

impl PipelineConfig {
    /// Reject configurations the pipeline cannot run.
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("rawInput", &self.raw_input),
            ("clippingMask", &self.clipping_mask),
            ("productOutput", &self.product_output),
        ];
        for (key, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::Config(format!("script.{} is empty", key)));
            }
        }
        if self.out_crs.trim().is_empty() {
            return Err(PipelineError::Config("script.outEPSG is empty".to_string()));
        }
        if self.products.is_empty() {
            return Err(PipelineError::Config("no products configured".to_string()));
        }

        for spec in &self.products {
            if spec.resolution.trim().is_empty() {
                return Err(PipelineError::Config(format!(
                    "product '{}' has an empty resolution",
                    spec.id
                )));
            }
            let missing = spec.missing_roles();
            if !missing.is_empty() {
                let roles: Vec<String> = missing.iter().map(|r| r.to_string()).collect();
                return Err(PipelineError::Config(format!(
                    "product '{}' ({}) has no band code for {}",
                    spec.id,
                    spec.name(),
                    roles.join(", ")
                )));
            }
        }
        Ok(())
    }
}
