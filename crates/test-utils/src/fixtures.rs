//! On-disk fixtures: a downloaded granule tree laid out the way the
//! downloader leaves it, plus a plain-text band format that fake raster
//! engines can read without GDAL.
//!
//! ```text
//! <root>/raw/<date>/<container>/GRANULE/<granuleId>/IMG_DATA/<resolution>/<bandFile>
//! <root>/out/
//! <root>/aoi.geojson
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::TempDir;
use walkdir::WalkDir;

/// A minimal AOI polygon, enough for anything that only needs the file to exist.
pub const SAMPLE_AOI_GEOJSON: &str = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[9.0,45.0],[9.5,45.0],[9.5,45.5],[9.0,45.5],[9.0,45.0]]]}}]}"#;

/// Write a band as text: a `width height` header line, then one line of
/// whitespace-separated values per row.
pub fn write_text_band(path: &Path, width: usize, height: usize, data: &[f32]) -> io::Result<()> {
    if data.len() != width * height {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} values for a {}x{} band", data.len(), width, height),
        ));
    }
    let mut text = format!("{} {}\n", width, height);
    for row in data.chunks(width.max(1)) {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        text.push_str(&line.join(" "));
        text.push('\n');
    }
    fs::write(path, text)
}

/// Read a band written by [`write_text_band`]. Returns `(data, width, height)`.
pub fn read_text_band(path: &Path) -> io::Result<(Vec<f32>, usize, usize)> {
    let text = fs::read_to_string(path)?;
    let invalid = |msg: String| io::Error::new(io::ErrorKind::InvalidData, msg);

    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| invalid(format!("{}: empty band file", path.display())))?;
    let dims: Vec<usize> = header
        .split_whitespace()
        .map(|t| t.parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|e| invalid(format!("{}: bad header: {}", path.display(), e)))?;
    let [width, height] = dims.as_slice() else {
        return Err(invalid(format!("{}: header needs width and height", path.display())));
    };

    let data: Vec<f32> = lines
        .flat_map(|l| l.split_whitespace())
        .map(|t| t.parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|e| invalid(format!("{}: bad value: {}", path.display(), e)))?;
    if data.len() != width * height {
        return Err(invalid(format!(
            "{}: {} values for a {}x{} band",
            path.display(),
            data.len(),
            width,
            height
        )));
    }
    Ok((data, *width, *height))
}

/// A temporary raw-input and product-output tree for one imagery date.
///
/// Everything lives under one [`TempDir`] and is removed on drop.
pub struct GranuleTree {
    root: TempDir,
    date: String,
    width: usize,
    height: usize,
}

impl GranuleTree {
    /// An empty tree for `date` (`YYYYMMDD`) with 2x2 bands.
    pub fn new(date: &str) -> Self {
        let root = tempfile::Builder::new()
            .prefix("granules_")
            .tempdir()
            .expect("Failed to create temporary granule tree");
        fs::create_dir_all(root.path().join("raw").join(date)).expect("create raw date dir");
        fs::create_dir_all(root.path().join("out")).expect("create output dir");
        fs::write(root.path().join("aoi.geojson"), SAMPLE_AOI_GEOJSON).expect("write AOI mask");
        Self {
            root,
            date: date.to_string(),
            width: 2,
            height: 2,
        }
    }

    /// Band shape used by [`add_granule`](Self::add_granule).
    pub fn with_shape(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn raw_input(&self) -> PathBuf {
        self.root.path().join("raw")
    }

    pub fn product_output(&self) -> PathBuf {
        self.root.path().join("out")
    }

    pub fn clipping_mask(&self) -> PathBuf {
        self.root.path().join("aoi.geojson")
    }

    /// Per-date output folder for `product`.
    pub fn output_folder(&self, product: &str) -> PathBuf {
        self.product_output().join(&self.date).join(product)
    }

    /// Add one downloaded container holding a single granule.
    ///
    /// Band files are named `<tile>_<timestamp>_<code>_<res>.jp2` where `res`
    /// is the resolution folder without its leading `R`. Each entry of
    /// `bands` is `(band code, pixels)`. Returns the image-data folder.
    pub fn add_granule(
        &self,
        container: &str,
        tile_id: &str,
        timestamp: &str,
        resolution: &str,
        bands: &[(&str, Vec<f32>)],
    ) -> PathBuf {
        let img_dir = self
            .raw_input()
            .join(&self.date)
            .join(container)
            .join("GRANULE")
            .join(format!("L2A_{}_A000001_{}", tile_id, timestamp))
            .join("IMG_DATA")
            .join(resolution);
        fs::create_dir_all(&img_dir).expect("create IMG_DATA dir");

        let res_suffix = resolution.trim_start_matches('R');
        for (code, data) in bands {
            let name = format!("{}_{}_{}_{}.jp2", tile_id, timestamp, code, res_suffix);
            write_text_band(&img_dir.join(name), self.width, self.height, data)
                .expect("write band file");
        }
        img_dir
    }

    /// Add a container with no `GRANULE` folder, which makes listing fail.
    pub fn add_broken_container(&self, container: &str) -> PathBuf {
        let dir = self.raw_input().join(&self.date).join(container);
        fs::create_dir_all(&dir).expect("create container dir");
        fs::write(dir.join("manifest.safe"), "<xml/>").expect("write manifest");
        dir
    }

    /// Write an arbitrary file at `relative` under the tree root.
    pub fn add_file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write file");
        path
    }
}

/// Observable state of one file in a tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    pub contents: Vec<u8>,
    pub modified: SystemTime,
}

/// Every regular file under `root`, keyed by path relative to `root`.
pub fn snapshot_tree(root: &Path) -> BTreeMap<PathBuf, FileState> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let (Ok(contents), Ok(meta)) = (fs::read(path), entry.metadata()) else {
            continue;
        };
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        files.insert(relative, FileState { contents, modified });
    }
    files
}

/// A product configuration in the JSON layout the processor reads.
pub fn sample_config_json(raw_input: &Path, mask: &Path, product_output: &Path) -> String {
    format!(
        r#"{{
  "script": {{
    "rawInput": "{}",
    "clippingMask": "{}",
    "outEPSG": "3857",
    "productOutput": "{}"
  }},
  "products": {{
    "ndvi": {{ "name": "NDVI", "resolution": "R10m", "bands": {{ "NIR": "B08", "RED": "B04" }} }},
    "ndwi": {{ "name": "NDWI", "resolution": "R10m", "bands": {{ "GREEN": "B03", "NIR": "B08" }} }}
  }}
}}"#,
        raw_input.display(),
        mask.display(),
        product_output.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_band_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("band.txt");
        write_text_band(&path, 3, 2, &[1.0, 2.0, 3.0, 0.0, -9999.9, 10000.0]).unwrap();
        let (data, w, h) = read_text_band(&path).unwrap();
        assert_eq!((w, h), (3, 2));
        assert_eq!(data, vec![1.0, 2.0, 3.0, 0.0, -9999.9, 10000.0]);
    }

    #[test]
    fn test_text_band_rejects_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("band.txt");
        assert!(write_text_band(&path, 2, 2, &[1.0]).is_err());
        fs::write(&path, "2 2\n1 2 3\n").unwrap();
        assert!(read_text_band(&path).is_err());
    }

    #[test]
    fn test_granule_tree_layout() {
        let tree = GranuleTree::new("20240115");
        let img = tree.add_granule(
            "S2A_MSIL2A_20240115T101321_T32TQM",
            "T32TQM",
            "20240115T101321",
            "R10m",
            &[("B04", vec![1.0; 4])],
        );
        assert!(img.ends_with("IMG_DATA/R10m"));
        assert!(img.join("T32TQM_20240115T101321_B04_10m.jp2").exists());
        assert!(tree.clipping_mask().exists());
        assert_eq!(
            tree.output_folder("NDVI"),
            tree.product_output().join("20240115").join("NDVI")
        );
    }

    #[test]
    fn test_snapshot_tree_sees_nested_files() {
        let tree = GranuleTree::new("20240115");
        tree.add_file("out/20240115/NDVI/a.tif", "x");
        let snap = snapshot_tree(&tree.product_output());
        assert_eq!(snap.len(), 1);
        assert!(snap.contains_key(Path::new("20240115/NDVI/a.tif")));
    }
}
