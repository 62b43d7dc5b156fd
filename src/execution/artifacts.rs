//! Listing of generated analysis artifacts

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Kinds of files the analysis step produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// `.png` plot
    Visualization,
    /// `.csv` comparison table
    Table,
}

impl ArtifactKind {
    /// Classify a path by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ArtifactKind::Visualization),
            "csv" => Some(ArtifactKind::Table),
            _ => None,
        }
    }
}

/// A generated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub size: u64,
}

/// Artifacts found in the analysis directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    pub dir: PathBuf,
    pub artifacts: Vec<Artifact>,
}

impl ArtifactReport {
    pub fn visualizations(&self) -> impl Iterator<Item = &Artifact> {
        self.of_kind(ArtifactKind::Visualization)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Artifact> {
        self.of_kind(ArtifactKind::Table)
    }

    fn of_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(move |a| a.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }
}

/// List the `.png` and `.csv` files in `dir` as they are right now
///
/// Only direct children are listed unless `recursive` is set. A missing
/// directory gives an empty report.
pub fn scan_artifacts(dir: &Path, recursive: bool) -> ArtifactReport {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut artifacts = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = ArtifactKind::from_path(entry.path()) else {
            continue;
        };
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        artifacts.push(Artifact {
            path: entry.into_path(),
            kind,
            size,
        });
    }

    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("Found {} artifacts in {}", artifacts.len(), dir.display());

    ArtifactReport {
        dir: dir.to_path_buf(),
        artifacts,
    }
}
