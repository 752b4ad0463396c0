//! Raw entry normalization.
//!
//! Converts raw walker output into canonical [`PathRecord`] values. Entries
//! that cannot be normalized (a race deleted the file mid-walk, the path
//! escaped its root) fail individually; callers count the failure and keep
//! going - normalization errors are never fatal to the batch.

use std::path::{Path, PathBuf};

use crate::error::{LocateError, Result};
use crate::types::{PathRecord, RecordKind};

/// One raw entry produced by the walker, before normalization.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub path: PathBuf,
    pub kind: RecordKind,
    pub size_bytes: u64,
    pub modified_at: Option<u64>,
}

/// Normalizes a raw entry discovered under `root` into a [`PathRecord`].
pub fn normalize_entry(entry: RawEntry, root: &Path) -> Result<PathRecord> {
    let relative = entry.path.strip_prefix(root).map_err(|_| {
        LocateError::Record(format!(
            "entry {} is not under root {}",
            entry.path.display(),
            root.display()
        ))
    })?;
    let depth = relative.components().count() as u32;

    let basename = match entry.path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        // The root itself ("/", "C:\") has no final component.
        None => entry.path.to_string_lossy().into_owned(),
    };

    if !entry.path.is_absolute() {
        return Err(LocateError::Record(format!(
            "entry path is not absolute: {}",
            entry.path.display()
        )));
    }

    Ok(PathRecord {
        full_path: entry.path.to_string_lossy().into_owned(),
        basename,
        depth,
        kind: entry.kind,
        size_bytes: entry.size_bytes,
        modified_at: entry.modified_at,
    })
}
