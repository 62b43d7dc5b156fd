//! Advisory check for the downloaded data files

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Which expected data files exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataVerification {
    pub dir: PathBuf,
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl DataVerification {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// One-line warning text, if anything is missing
    pub fn warning(&self) -> Option<String> {
        if self.is_complete() {
            return None;
        }
        Some(format!(
            "Missing data files in {}: {}",
            self.dir.display(),
            self.missing.join(", ")
        ))
    }
}

/// Check that each of `files` exists under `dir`
///
/// Never fails: missing files are reported, not raised.
pub fn verify_data_files(dir: &Path, files: &[String]) -> DataVerification {
    let (present, missing): (Vec<String>, Vec<String>) =
        files.iter().cloned().partition(|file| dir.join(file).exists());

    for file in &missing {
        warn!("Missing data file: {}", dir.join(file).display());
    }
    debug!("{} of {} data files present", present.len(), files.len());

    DataVerification {
        dir: dir.to_path_buf(),
        present,
        missing,
    }
}
