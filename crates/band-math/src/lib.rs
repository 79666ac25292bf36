//! Spectral index calculation.
//!
//! Each supported index is a small strategy implementing [`IndexCalculator`].
//! The set is closed: [`calculator_for`] maps every [`IndexKind`] to its
//! strategy, and callers pick one once per product rather than per tile.
//!
//! All strategies share the same post-processing, applied to every pixel:
//!
//! - raw digital numbers are scaled to reflectance (`/ 10000`);
//! - a pixel where any contributing raw band is exactly `0` is no-data;
//! - a NaN or infinite result is no-data;
//! - a result outside the index's valid domain is no-data.
//!
//! No-data pixels carry [`INDEX_NODATA`](sentinel_common::INDEX_NODATA).

pub mod error;
pub mod indices;
pub mod stats;

pub use error::{CalculationError, Result};
pub use indices::{calculator_for, finalize_pixel, BandSet, Evi, IndexCalculator, Ndmi, Ndvi, Ndwi};
pub use stats::IndexStats;
