//! Core record and result types for the location index.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::canonicalize_existing_path;

/// Filesystem entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "other",
        }
    }
}

/// One indexed filesystem entry.
///
/// `full_path` is absolute and normalized (roots are canonicalized before
/// traversal, children are built by joining names onto them) and is the
/// unique key within a committed generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub full_path: String,
    /// Final path component, used for basename-only matching.
    pub basename: String,
    /// Path-separator distance from the root the entry was discovered under.
    pub depth: u32,
    pub kind: RecordKind,
    /// Meaningful only for `RecordKind::File`; zero otherwise.
    pub size_bytes: u64,
    /// Unix seconds, best-effort. Absent when the metadata was unreadable.
    pub modified_at: Option<u64>,
}

impl PathRecord {
    /// Whether this record's path falls under `root`.
    pub fn is_under(&self, root: &Path) -> bool {
        Path::new(&self.full_path).starts_with(root)
    }
}

// ---------------------------------------------------------------------------
// RootSet
// ---------------------------------------------------------------------------

/// The ordered, deduplicated set of top-level paths to traverse.
///
/// Construction canonicalizes each path, drops paths that do not exist
/// (with a warning), drops exact duplicates, and drops roots that are
/// descendants of another configured root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSet {
    roots: Vec<PathBuf>,
}

impl RootSet {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();
        for path in paths {
            if std::fs::symlink_metadata(&path).is_err() {
                log::warn!("root does not exist, skipping: {}", path.display());
                continue;
            }
            let canonical = canonicalize_existing_path(path);
            if roots.contains(&canonical) {
                continue;
            }
            roots.push(canonical);
        }

        // Drop roots nested under another configured root.
        let deduped = roots
            .iter()
            .filter(|root| {
                !roots
                    .iter()
                    .any(|other| *root != other && root.starts_with(other))
            })
            .cloned()
            .collect();

        Self { roots: deduped }
    }

    /// A root set from already-canonical paths, without filesystem checks.
    /// Used when restoring persisted root lists.
    pub(crate) fn from_canonical(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Whether any root here equals, contains, or is contained by any of
    /// `other`'s roots. Used for update conflict detection.
    pub fn overlaps(&self, other: &[PathBuf]) -> bool {
        self.roots.iter().any(|a| {
            other
                .iter()
                .any(|b| a == b || a.starts_with(b) || b.starts_with(a))
        })
    }
}

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

/// Outcome of one committed index update.
#[derive(Debug, Clone)]
pub struct UpdateSummary {
    /// Records written into the committed generation.
    pub records_indexed: usize,
    /// Per-entry traversal and record errors skipped during the walk.
    pub errors_skipped: usize,
    /// Wall-clock time from walk start to commit.
    pub duration: Duration,
}

/// Index metadata reported by the stats surface.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub record_count: usize,
    pub root_count: usize,
    /// Unix seconds of the last commit; `None` for a fresh empty index.
    pub generation_timestamp: Option<u64>,
    pub size_bytes_on_disk: u64,
}
