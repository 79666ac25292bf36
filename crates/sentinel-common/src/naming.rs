//! Filename token contract.
//!
//! Raw Sentinel-2 band files are named
//! `<tile>_<sensingTimestamp>_<bandCode>[_<resolution>...].<ext>`, e.g.
//! `T33TTG_20250305T100029_B08_10m.jp2`. Splitting the file name on `_`:
//!
//! | token | meaning |
//! |---|---|
//! | 0 | tile id (`T33TTG`) |
//! | 1 | sensing timestamp (`20250305T100029`) |
//! | 2 | band code (`B08`), compared verbatim against the configured code |
//!
//! Output tiles are named `<token0>_<token1>_<product>_<granuleIndex>.tif`.
//! Every band of one granule shares tokens 0 and 1, so the tile name does not
//! depend on which band was matched first.
//!
//! The per-date mosaic is named `<sensingDate>_<product>.vrt`, where the
//! sensing date is the first eight characters of tile token 1.

use std::fmt;
use std::path::Path;

use crate::error::{CommonError, CommonResult};
use crate::product::IndexKind;
use crate::time::SensingDate;

/// Separator between filename tokens.
pub const TOKEN_SEPARATOR: char = '_';

/// Extension of output tiles.
pub const TILE_EXTENSION: &str = "tif";

/// Extension of virtual mosaics.
pub const MOSAIC_EXTENSION: &str = "vrt";

/// Tokens of a raw band filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandFileName {
    pub tile_id: String,
    pub timestamp: String,
    pub band_code: String,
}

impl BandFileName {
    /// Split a raw band file name. Names with fewer than three tokens are rejected.
    pub fn parse(file_name: &str) -> CommonResult<Self> {
        let mut tokens = file_name.split(TOKEN_SEPARATOR);
        let (Some(tile_id), Some(timestamp), Some(band_token)) =
            (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(CommonError::malformed_file_name(
                file_name,
                "expected at least three '_'-separated tokens",
            ));
        };

        // A three-token name carries its extension on the band token.
        let band_code = match tokens.next() {
            Some(_) => band_token,
            None => Path::new(band_token)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(band_token),
        };

        if tile_id.is_empty() || timestamp.is_empty() || band_code.is_empty() {
            return Err(CommonError::malformed_file_name(file_name, "empty token"));
        }

        Ok(Self {
            tile_id: tile_id.to_string(),
            timestamp: timestamp.to_string(),
            band_code: band_code.to_string(),
        })
    }

    pub fn matches_code(&self, code: &str) -> bool {
        self.band_code == code
    }
}

/// Deterministic name of one product tile for one granule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFileName {
    pub tile_id: String,
    pub timestamp: String,
    pub index: IndexKind,
    pub granule_index: usize,
}

impl TileFileName {
    /// Name the tile produced from `band`'s granule.
    pub fn for_band(band: &BandFileName, index: IndexKind, granule_index: usize) -> Self {
        Self {
            tile_id: band.tile_id.clone(),
            timestamp: band.timestamp.clone(),
            index,
            granule_index,
        }
    }

    /// Parse a tile file name produced by [`file_name`](Self::file_name).
    pub fn parse(file_name: &str) -> CommonResult<Self> {
        let stem = file_name
            .strip_suffix(&format!(".{}", TILE_EXTENSION))
            .ok_or_else(|| {
                CommonError::malformed_file_name(file_name, "tile names end in .tif")
            })?;

        let tokens: Vec<&str> = stem.split(TOKEN_SEPARATOR).collect();
        let [tile_id, timestamp, product, granule] = tokens.as_slice() else {
            return Err(CommonError::malformed_file_name(
                file_name,
                "expected <tile>_<timestamp>_<product>_<granule>.tif",
            ));
        };

        let index = product.parse::<IndexKind>()?;
        let granule_index = granule.parse::<usize>().map_err(|e| {
            CommonError::malformed_file_name(file_name, format!("granule index: {}", e))
        })?;

        Ok(Self {
            tile_id: tile_id.to_string(),
            timestamp: timestamp.to_string(),
            index,
            granule_index,
        })
    }

    pub fn file_name(&self) -> String {
        self.to_string()
    }

    pub fn sensing_date(&self) -> CommonResult<SensingDate> {
        SensingDate::from_timestamp_token(&self.timestamp)
    }

    /// File name of the mosaic this tile belongs to.
    pub fn mosaic_file_name(&self) -> CommonResult<String> {
        let date = self.sensing_date()?;
        Ok(format!(
            "{}{}{}.{}",
            date,
            TOKEN_SEPARATOR,
            self.index.name(),
            MOSAIC_EXTENSION
        ))
    }
}

impl fmt::Display for TileFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}.{}",
            self.tile_id,
            self.timestamp,
            self.index.name(),
            self.granule_index,
            TILE_EXTENSION
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_l2a_band_name() {
        let band = BandFileName::parse("T33TTG_20250305T100029_B08_10m.jp2").unwrap();
        assert_eq!(band.tile_id, "T33TTG");
        assert_eq!(band.timestamp, "20250305T100029");
        assert_eq!(band.band_code, "B08");
        assert!(band.matches_code("B08"));
        assert!(!band.matches_code("B8A"));
    }

    #[test]
    fn test_parse_three_token_name_drops_extension() {
        let band = BandFileName::parse("T33TTG_20250305T100029_B8A.jp2").unwrap();
        assert_eq!(band.band_code, "B8A");
    }

    #[test]
    fn test_reject_short_names() {
        assert!(BandFileName::parse("MTD_TL.xml").is_err());
        assert!(BandFileName::parse("README").is_err());
        assert!(BandFileName::parse("__B08").is_err());
    }

    #[test]
    fn test_tile_name_is_band_independent() {
        let nir = BandFileName::parse("T33TTG_20250305T100029_B08_10m.jp2").unwrap();
        let red = BandFileName::parse("T33TTG_20250305T100029_B04_10m.jp2").unwrap();
        let a = TileFileName::for_band(&nir, IndexKind::Ndvi, 3);
        let b = TileFileName::for_band(&red, IndexKind::Ndvi, 3);
        assert_eq!(a, b);
        assert_eq!(a.file_name(), "T33TTG_20250305T100029_NDVI_3.tif");
    }

    #[test]
    fn test_tile_name_parse() {
        let tile = TileFileName::parse("T33TTG_20250305T100029_EVI_0.tif").unwrap();
        assert_eq!(tile.index, IndexKind::Evi);
        assert_eq!(tile.granule_index, 0);
        assert_eq!(tile.file_name(), "T33TTG_20250305T100029_EVI_0.tif");

        assert!(TileFileName::parse("T33TTG_20250305T100029_EVI_0.vrt").is_err());
        assert!(TileFileName::parse("T33TTG_20250305T100029_XYZ_0.tif").is_err());
        assert!(TileFileName::parse("T33TTG_EVI_0.tif").is_err());
    }

    #[test]
    fn test_mosaic_name_from_tile() {
        let tile = TileFileName::parse("T33TTG_20250305T100029_NDWI_1.tif").unwrap();
        assert_eq!(tile.mosaic_file_name().unwrap(), "20250305_NDWI.vrt");
    }
}
