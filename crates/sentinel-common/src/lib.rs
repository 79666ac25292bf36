//! Common types and utilities shared across the Sentinel-2 product crates.

pub mod error;
pub mod grid;
pub mod naming;
pub mod product;
pub mod time;

pub use error::{CommonError, CommonResult};
pub use grid::Grid;
pub use naming::{BandFileName, TileFileName};
pub use product::{BandCode, BandRole, IndexKind, Product, ProductSpec};
pub use time::{ImageryDate, SensingDate};

/// No-data marker written into every computed index grid and output tile.
pub const INDEX_NODATA: f32 = -9999.0;

/// No-data value assumed for a raw band whose source declares none.
pub const DEFAULT_BAND_NODATA: f64 = -9999.9;

/// Scale factor between Sentinel-2 L2A digital numbers and reflectance.
pub const REFLECTANCE_SCALE: f32 = 10000.0;
