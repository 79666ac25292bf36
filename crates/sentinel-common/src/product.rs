//! Product definitions: which index, over which bands, at which resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{CommonError, CommonResult};
use crate::time::ImageryDate;

/// The closed set of spectral indices this system produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexKind {
    /// Enhanced Vegetation Index
    Evi,
    /// Normalized Difference Moisture Index
    Ndmi,
    /// Normalized Difference Water Index
    Ndwi,
    /// Normalized Difference Vegetation Index
    Ndvi,
}

impl IndexKind {
    pub const ALL: [IndexKind; 4] = [
        IndexKind::Evi,
        IndexKind::Ndmi,
        IndexKind::Ndwi,
        IndexKind::Ndvi,
    ];

    /// Product name as used in output paths and publication.
    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::Evi => "EVI",
            IndexKind::Ndmi => "NDMI",
            IndexKind::Ndwi => "NDWI",
            IndexKind::Ndvi => "NDVI",
        }
    }

    /// Band roles the formula reads, in formula order.
    pub fn required_roles(&self) -> &'static [BandRole] {
        match self {
            IndexKind::Evi => &[BandRole::Nir, BandRole::Red, BandRole::Blue],
            IndexKind::Ndmi => &[BandRole::NirNarrow, BandRole::Swir],
            IndexKind::Ndwi => &[BandRole::Green, BandRole::Nir],
            IndexKind::Ndvi => &[BandRole::Nir, BandRole::Red],
        }
    }

    /// Inclusive `(min, max)` range of valid output values.
    pub fn valid_domain(&self) -> (f32, f32) {
        match self {
            IndexKind::Evi => (-1.0, 1.25),
            IndexKind::Ndmi | IndexKind::Ndwi | IndexKind::Ndvi => (-1.0, 1.0),
        }
    }
}

impl FromStr for IndexKind {
    type Err = CommonError;

    fn from_str(s: &str) -> CommonResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EVI" => Ok(IndexKind::Evi),
            "NDMI" => Ok(IndexKind::Ndmi),
            "NDWI" => Ok(IndexKind::Ndwi),
            "NDVI" => Ok(IndexKind::Ndvi),
            _ => Err(CommonError::UnknownIndex(s.to_string())),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical spectral role of a band, independent of the sensor's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BandRole {
    Blue,
    Green,
    Red,
    /// Broad near-infrared (Sentinel-2 B08)
    Nir,
    /// Narrow near-infrared (Sentinel-2 B8A)
    NirNarrow,
    /// Short-wave infrared (Sentinel-2 B11)
    Swir,
}

impl BandRole {
    /// Sentinel-2 MSI band code conventionally bound to this role.
    pub fn default_code(&self) -> &'static str {
        match self {
            BandRole::Blue => "B02",
            BandRole::Green => "B03",
            BandRole::Red => "B04",
            BandRole::Nir => "B08",
            BandRole::NirNarrow => "B8A",
            BandRole::Swir => "B11",
        }
    }
}

impl fmt::Display for BandRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BandRole::Blue => "BLUE",
            BandRole::Green => "GREEN",
            BandRole::Red => "RED",
            BandRole::Nir => "NIR",
            BandRole::NirNarrow => "NIR_NARROW",
            BandRole::Swir => "SWIR",
        };
        f.write_str(s)
    }
}

/// Sensor band code as it appears in raw filenames (e.g. `B08`).
///
/// Codes are matched against an underscore-delimited filename token, so they
/// can never contain `_` themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BandCode(String);

impl BandCode {
    pub fn new(code: impl Into<String>) -> CommonResult<Self> {
        let code = code.into();
        if code.is_empty() || code.contains('_') || code.contains(char::is_whitespace) {
            return Err(CommonError::InvalidBandCode(code));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BandCode {
    type Error = CommonError;

    fn try_from(s: String) -> CommonResult<Self> {
        Self::new(s)
    }
}

impl From<BandCode> for String {
    fn from(c: BandCode) -> Self {
        c.0
    }
}

impl fmt::Display for BandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A configured product: one index at one resolution with its band bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSpec {
    /// Configuration key of the product
    pub id: String,
    /// Which index to compute
    pub index: IndexKind,
    /// Resolution folder name under `IMG_DATA` (e.g. `R10m`)
    pub resolution: String,
    /// Role → sensor band code
    pub bands: BTreeMap<BandRole, BandCode>,
}

impl ProductSpec {
    pub fn name(&self) -> &'static str {
        self.index.name()
    }

    pub fn band_code(&self, role: BandRole) -> Option<&BandCode> {
        self.bands.get(&role)
    }

    /// Roles the index needs that have no band code bound.
    pub fn missing_roles(&self) -> Vec<BandRole> {
        self.index
            .required_roles()
            .iter()
            .copied()
            .filter(|role| !self.bands.contains_key(role))
            .collect()
    }

    /// `(role, code)` for every role the index reads, in formula order.
    ///
    /// Roles without a binding are left out; check [`missing_roles`](Self::missing_roles) first.
    pub fn required_bands(&self) -> Vec<(BandRole, &BandCode)> {
        self.index
            .required_roles()
            .iter()
            .filter_map(|role| self.bands.get(role).map(|code| (*role, code)))
            .collect()
    }
}

/// A product that finished mosaic assembly and can be announced downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub new_date: ImageryDate,
    pub mosaic_path: PathBuf,
}
