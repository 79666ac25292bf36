//! Per-date virtual mosaic of a product's tiles.

use std::path::{Path, PathBuf};

use sentinel_common::TileFileName;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::raster::RasterEngine;

/// Arguments for `gdalbuildvrt` writing `mosaic` from `tiles` in order.
pub fn gdalbuildvrt_args(mosaic: &Path, tiles: &[PathBuf]) -> Vec<String> {
    let mut args = Vec::with_capacity(tiles.len() + 2);
    args.push("-overwrite".to_string());
    args.push(mosaic.display().to_string());
    args.extend(tiles.iter().map(|t| t.display().to_string()));
    args
}

/// Mosaic file name for a tile list: taken from the last tile.
pub fn mosaic_file_name(tiles: &[PathBuf]) -> Result<Option<String>> {
    let Some(last) = tiles.last() else {
        return Ok(None);
    };
    let name = last
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PipelineError::mosaic(last, "tile path has no file name"))?;
    let tile = TileFileName::parse(name)?;
    Ok(Some(tile.mosaic_file_name()?))
}

/// Builds one mosaic per product and date from the tiles produced for it.
pub struct MosaicBuilder;

impl MosaicBuilder {
    /// Build `<folder>/<sensingDate>_<product>.vrt` over `tiles`.
    ///
    /// `tiles` must be non-empty; their order is kept in the mosaic.
    pub fn build<E: RasterEngine>(
        engine: &E,
        product: &str,
        folder: &Path,
        tiles: &[PathBuf],
    ) -> Result<PathBuf> {
        let name = mosaic_file_name(tiles)?.ok_or_else(|| PipelineError::EmptyMosaic {
            product: product.to_string(),
        })?;
        let mosaic = folder.join(name);

        engine.build_mosaic(&mosaic, tiles)?;
        info!(
            product = %product,
            path = %mosaic.display(),
            tiles = tiles.len(),
            "Built mosaic"
        );
        Ok(mosaic)
    }
}
