//! Summary statistics over a computed index grid.

use sentinel_common::{Grid, INDEX_NODATA};

/// Counts and value range of a computed grid, ignoring no-data pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndexStats {
    pub total: usize,
    pub valid: usize,
    pub nodata: usize,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub mean: Option<f64>,
}

impl IndexStats {
    pub fn from_grid(grid: &Grid) -> Self {
        let mut stats = IndexStats {
            total: grid.len(),
            ..Default::default()
        };
        let mut sum = 0.0f64;

        for &v in &grid.data {
            if v == INDEX_NODATA {
                stats.nodata += 1;
                continue;
            }
            stats.valid += 1;
            sum += v as f64;
            stats.min = Some(stats.min.map_or(v, |m| m.min(v)));
            stats.max = Some(stats.max.map_or(v, |m| m.max(v)));
        }

        if stats.valid > 0 {
            stats.mean = Some(sum / stats.valid as f64);
        }
        stats
    }

    /// Fraction of pixels that carry a value.
    pub fn valid_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.valid as f64 / self.total as f64
        }
    }
}
