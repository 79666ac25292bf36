//! Date handling for imagery runs.
//!
//! Two dates travel through the pipeline and are deliberately distinct types:
//!
//! - [`ImageryDate`] is the run date handed over by the download stage. It names
//!   the per-date input directory and the per-date output directory.
//! - [`SensingDate`] is read back out of a band/tile filename. It names the
//!   mosaic file.
//!
//! Nothing guarantees the two agree (a scene sensed late on one day can be
//! downloaded into the next day's folder), so neither is derived from the other.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CommonError, CommonResult};

const COMPACT_FORMAT: &str = "%Y%m%d";

fn parse_compact(s: &str) -> CommonResult<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CommonError::InvalidDate {
            value: s.to_string(),
            message: "expected YYYYMMDD".to_string(),
        });
    }
    NaiveDate::parse_from_str(s, COMPACT_FORMAT).map_err(|e| CommonError::InvalidDate {
        value: s.to_string(),
        message: e.to_string(),
    })
}

/// Acquisition date of a run, `YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageryDate(NaiveDate);

impl ImageryDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Directory component used under both the raw-input and product-output roots.
    pub fn folder_name(&self) -> String {
        self.to_string()
    }
}

impl FromStr for ImageryDate {
    type Err = CommonError;

    fn from_str(s: &str) -> CommonResult<Self> {
        parse_compact(s.trim()).map(Self)
    }
}

impl TryFrom<String> for ImageryDate {
    type Error = CommonError;

    fn try_from(s: String) -> CommonResult<Self> {
        s.parse()
    }
}

impl From<ImageryDate> for String {
    fn from(d: ImageryDate) -> Self {
        d.to_string()
    }
}

impl fmt::Display for ImageryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(COMPACT_FORMAT))
    }
}

/// Sensing date embedded in a Sentinel-2 filename timestamp token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensingDate(NaiveDate);

impl SensingDate {
    /// Parse from a timestamp token such as `20250305T100029`.
    ///
    /// Only the leading eight characters are interpreted.
    pub fn from_timestamp_token(token: &str) -> CommonResult<Self> {
        let prefix = token.get(..8).ok_or_else(|| CommonError::InvalidDate {
            value: token.to_string(),
            message: "timestamp token shorter than 8 characters".to_string(),
        })?;
        parse_compact(prefix).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for SensingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(COMPACT_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_imagery_date() {
        let d: ImageryDate = "20250305".parse().unwrap();
        assert_eq!(d.date().year(), 2025);
        assert_eq!(d.date().month(), 3);
        assert_eq!(d.date().day(), 5);
        assert_eq!(d.to_string(), "20250305");
        assert_eq!(d.folder_name(), "20250305");
    }

    #[test]
    fn test_reject_bad_imagery_dates() {
        assert!("2025-03-05".parse::<ImageryDate>().is_err());
        assert!("20251305".parse::<ImageryDate>().is_err());
        assert!("2025030".parse::<ImageryDate>().is_err());
        assert!("".parse::<ImageryDate>().is_err());
    }

    #[test]
    fn test_sensing_date_from_token() {
        let d = SensingDate::from_timestamp_token("20250305T100029").unwrap();
        assert_eq!(d.to_string(), "20250305");
        assert!(SensingDate::from_timestamp_token("2025").is_err());
        assert!(SensingDate::from_timestamp_token("T33TTG").is_err());
    }

    #[test]
    fn test_imagery_date_serde_as_string() {
        let d: ImageryDate = serde_json::from_str("\"20240115\"").unwrap();
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"20240115\"");
        assert!(serde_json::from_str::<ImageryDate>("\"yesterday\"").is_err());
    }
}
