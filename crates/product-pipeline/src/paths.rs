//! Maps one date's downloaded granule tree to per-granule processing paths.
//!
//! Input layout:
//!
//! ```text
//! <rawInput>/<date>/<container>/GRANULE/<granuleId>/IMG_DATA/<resolution>/<bandFile>
//! ```
//!
//! Containers are visited in name order and a granule's index is its
//! container's position in that order, so reruns name tiles identically.

use std::fs;
use std::path::{Path, PathBuf};

use sentinel_common::{BandCode, BandFileName, BandRole, ImageryDate, ProductSpec, TileFileName};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

const GRANULE_DIR: &str = "GRANULE";
const IMAGE_DATA_DIR: &str = "IMG_DATA";

/// One resolved input band of a granule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBand {
    pub role: BandRole,
    pub code: BandCode,
    pub path: PathBuf,
}

/// Inputs and output location for one (product, granule) tile.
///
/// Only built when every band the product needs was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingPath {
    pub granule_index: usize,
    /// Bands in formula order
    pub bands: Vec<ResolvedBand>,
    pub output_folder: PathBuf,
    pub output_file_name: TileFileName,
}

impl ProcessingPath {
    /// Absolute path of the tile file.
    pub fn output_path(&self) -> PathBuf {
        self.output_folder.join(self.output_file_name.file_name())
    }
}

/// A granule that lacks one or more configured band files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteGranule {
    pub granule_index: usize,
    pub image_dir: PathBuf,
    pub missing: Vec<BandCode>,
}

/// Resolution result for one product and date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Granules ready for the tile pipeline, in granule order
    pub complete: Vec<ProcessingPath>,
    /// Granules that will not be tiled
    pub incomplete: Vec<IncompleteGranule>,
}

/// Resolves granule trees under a raw-input root into processing paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    raw_input: PathBuf,
    product_output: PathBuf,
}

impl PathResolver {
    pub fn new(raw_input: impl Into<PathBuf>, product_output: impl Into<PathBuf>) -> Self {
        Self {
            raw_input: raw_input.into(),
            product_output: product_output.into(),
        }
    }

    /// `<productOutput>/<date>/<productName>`.
    pub fn output_folder(&self, spec: &ProductSpec, date: ImageryDate) -> PathBuf {
        self.product_output
            .join(date.folder_name())
            .join(spec.name())
    }

    /// Resolve every granule of `date` for `spec`.
    ///
    /// Any granule whose `GRANULE` or image-data folder is missing or empty
    /// aborts the whole date with [`PipelineError::GranuleListing`]; no
    /// partial result is returned.
    pub fn resolve(&self, spec: &ProductSpec, date: ImageryDate) -> Result<ResolvedPaths> {
        let date_dir = self.raw_input.join(date.folder_name());
        let containers = sorted_dirs(&date_dir)?;
        let output_folder = self.output_folder(spec, date);
        let required = spec.required_bands();

        let mut resolved = ResolvedPaths::default();

        for (granule_index, container) in containers.iter().enumerate() {
            let granule_dir = first_entry(&container.join(GRANULE_DIR))?;
            let image_dir = granule_dir
                .join(IMAGE_DATA_DIR)
                .join(&spec.resolution);
            let files = sorted_files(&image_dir)?;

            let mut bands = Vec::with_capacity(required.len());
            let mut tile_tokens: Option<BandFileName> = None;
            let mut missing = Vec::new();

            for (role, code) in &required {
                let found = files.iter().find_map(|path| {
                    let name = path.file_name()?.to_str()?;
                    let parsed = BandFileName::parse(name).ok()?;
                    parsed
                        .matches_code(code.as_str())
                        .then(|| (parsed, path.clone()))
                });

                match found {
                    Some((parsed, path)) => {
                        tile_tokens.get_or_insert(parsed);
                        bands.push(ResolvedBand {
                            role: *role,
                            code: (*code).clone(),
                            path,
                        });
                    }
                    None => missing.push((*code).clone()),
                }
            }

            match tile_tokens {
                Some(tokens) if missing.is_empty() => {
                    let output_file_name =
                        TileFileName::for_band(&tokens, spec.index, granule_index);
                    debug!(
                        product = %spec.name(),
                        granule = granule_index,
                        tile = %output_file_name,
                        "Resolved granule"
                    );
                    resolved.complete.push(ProcessingPath {
                        granule_index,
                        bands,
                        output_folder: output_folder.clone(),
                        output_file_name,
                    });
                }
                _ => {
                    let codes: Vec<&str> = missing.iter().map(|c| c.as_str()).collect();
                    warn!(
                        product = %spec.name(),
                        granule = granule_index,
                        path = %image_dir.display(),
                        missing = ?codes,
                        "Granule is missing band files, not tiling it"
                    );
                    resolved.incomplete.push(IncompleteGranule {
                        granule_index,
                        image_dir,
                        missing,
                    });
                }
            }
        }

        Ok(resolved)
    }
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::listing(dir, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::listing(dir, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| PipelineError::listing(entry.path(), e))?
            .is_dir();
        out.push((entry.path(), is_dir));
    }
    out.sort();
    Ok(out)
}

/// Sub-directories of a date folder, in name order. Stray files are ignored.
fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(read_dir_sorted(dir)?
        .into_iter()
        .filter_map(|(path, is_dir)| is_dir.then_some(path))
        .collect())
}

/// First entry of a `GRANULE` folder in name order.
fn first_entry(dir: &Path) -> Result<PathBuf> {
    read_dir_sorted(dir)?
        .into_iter()
        .next()
        .map(|(path, _)| path)
        .ok_or_else(|| PipelineError::listing(dir, "no granule folder"))
}

/// Band files in an image-data folder, in name order.
fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = read_dir_sorted(dir)?
        .into_iter()
        .filter_map(|(path, is_dir)| (!is_dir).then_some(path))
        .collect();
    if files.is_empty() {
        return Err(PipelineError::listing(dir, "no band files"));
    }
    Ok(files)
}
