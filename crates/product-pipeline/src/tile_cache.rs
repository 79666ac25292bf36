//! Existence of the tile file is the cache key.
//!
//! Tiles only appear at their final path after a successful warp (see
//! [`ClipReprojectStage`](crate::warp::ClipReprojectStage)), so any file
//! there is a finished tile and is never recomputed or overwritten.

use std::path::Path;

/// Decides whether a tile still has to be produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileCache;

impl TileCache {
    pub fn new() -> Self {
        Self
    }

    /// True when a finished tile already exists at `tile`.
    pub fn contains(&self, tile: &Path) -> bool {
        tile.is_file()
    }
}
