//! Clip to the AOI and reproject one materialized raster into a tile file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::raster::{RasterEngine, WarpRequest};

/// No-data value written by the warp into pixels outside the cutline.
pub const WARP_DST_NODATA: &str = "-9999";

/// Accept `EPSG:3857` or bare `3857`.
pub fn normalize_crs(crs: &str) -> String {
    let crs = crs.trim();
    if !crs.is_empty() && crs.bytes().all(|b| b.is_ascii_digit()) {
        format!("EPSG:{}", crs)
    } else {
        crs.to_string()
    }
}

/// Arguments for `gdalwarp` reading `source` and writing `request.destination`.
pub fn gdalwarp_args(source: &Path, request: &WarpRequest) -> Vec<String> {
    vec![
        "-of".to_string(),
        "GTiff".to_string(),
        "-cutline".to_string(),
        request.mask.display().to_string(),
        "-dstnodata".to_string(),
        WARP_DST_NODATA.to_string(),
        "-t_srs".to_string(),
        request.target_crs.clone(),
        source.display().to_string(),
        request.destination.display().to_string(),
    ]
}

/// Name the warp writes to before the tile is moved into place.
///
/// Hidden and without the tile extension, so neither the cache nor a
/// directory listing of tiles mistakes it for a finished tile.
pub fn staging_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.partial", name))
}

/// Runs the engine's warp into a staging file and publishes the tile only on success.
pub struct ClipReprojectStage {
    mask: PathBuf,
    target_crs: String,
}

impl ClipReprojectStage {
    pub fn new(mask: impl Into<PathBuf>, target_crs: &str) -> Self {
        Self {
            mask: mask.into(),
            target_crs: normalize_crs(target_crs),
        }
    }

    pub fn target_crs(&self) -> &str {
        &self.target_crs
    }

    /// Warp `raster` to `destination`.
    ///
    /// On failure nothing is left at `destination`.
    pub fn run<E: RasterEngine>(
        &self,
        engine: &E,
        raster: &E::Raster,
        destination: &Path,
    ) -> Result<()> {
        let staging = staging_path(destination);
        if staging.exists() {
            debug!(path = %staging.display(), "Removing stale staging file");
            fs::remove_file(&staging).map_err(|e| PipelineError::warp(&staging, e))?;
        }

        let request = WarpRequest {
            mask: self.mask.clone(),
            target_crs: self.target_crs.clone(),
            destination: staging.clone(),
        };

        if let Err(e) = engine.clip_reproject(raster, &request) {
            discard(&staging);
            return Err(e);
        }

        if !staging.is_file() {
            return Err(PipelineError::warp(
                destination,
                "warp reported success but wrote no file",
            ));
        }

        fs::rename(&staging, destination).map_err(|e| {
            discard(&staging);
            PipelineError::warp(destination, e)
        })
    }
}

fn discard(staging: &Path) {
    if staging.exists() {
        if let Err(e) = fs::remove_file(staging) {
            warn!(path = %staging.display(), error = %e, "Failed to remove staging file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_crs() {
        assert_eq!(normalize_crs("3857"), "EPSG:3857");
        assert_eq!(normalize_crs(" 32632 "), "EPSG:32632");
        assert_eq!(normalize_crs("EPSG:4326"), "EPSG:4326");
        assert_eq!(normalize_crs("+proj=longlat"), "+proj=longlat");
        assert_eq!(normalize_crs(""), "");
    }

    #[test]
    fn test_gdalwarp_args() {
        let request = WarpRequest {
            mask: PathBuf::from("/aoi/area.geojson"),
            target_crs: "EPSG:3857".to_string(),
            destination: PathBuf::from("/out/tile.tif"),
        };
        let args = gdalwarp_args(Path::new("/tmp/src.tif"), &request);
        assert_eq!(
            args,
            vec![
                "-of",
                "GTiff",
                "-cutline",
                "/aoi/area.geojson",
                "-dstnodata",
                "-9999",
                "-t_srs",
                "EPSG:3857",
                "/tmp/src.tif",
                "/out/tile.tif"
            ]
        );
    }

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        let staging = staging_path(Path::new("/out/20240115/NDVI/T32TQM_20240115T101321_NDVI_0.tif"));
        assert_eq!(
            staging,
            PathBuf::from("/out/20240115/NDVI/.T32TQM_20240115T101321_NDVI_0.tif.partial")
        );
    }
}
