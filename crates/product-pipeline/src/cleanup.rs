//! Removal of downloaded intermediate data after a run.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;

/// Outcome of [`clear_intermediate_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Sub-directories deleted
    pub removed: usize,
    /// Entries that could not be deleted
    pub skipped: usize,
}

/// Delete every sub-directory of `dir`, keeping plain files such as logs.
///
/// Failing to read `dir` itself is an error; failures on individual entries
/// are logged and counted.
pub fn clear_intermediate_data(dir: &Path) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to read directory entry");
                report.skipped += 1;
                continue;
            }
        };
        let path = entry.path();
        let is_dir = match entry.file_type() {
            Ok(t) => t.is_dir(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat entry");
                report.skipped += 1;
                continue;
            }
        };
        if !is_dir {
            continue;
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => report.removed += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove intermediate data");
                report.skipped += 1;
            }
        }
    }

    info!(
        path = %dir.display(),
        removed = report.removed,
        skipped = report.skipped,
        "Cleared intermediate data"
    );
    Ok(report)
}
