//! Parallel filesystem walking.
//!
//! Each configured root is walked with a bounded worker pool. Workers push
//! raw entries into per-thread buffers that merge into one shared vector -
//! the only shared mutable state - so the hot traversal path stays free of
//! lock contention. Entries arrive unordered; consumers must not assume any
//! ordering across or within directories.
//!
//! Error policy: an unreadable directory or entry is counted and skipped
//! (logged when `verbose`), never aborting the walk. Symlinks are not
//! followed unless requested; when following is enabled the walker tracks
//! visited (device, inode) pairs to break cycles, surfacing a loop as a
//! skipped entry like any other per-entry error.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::available_parallelism;
use std::time::SystemTime;

use ignore::{DirEntry, WalkBuilder, WalkState};
use parking_lot::Mutex;

use crate::cancel::CancellationToken;
use crate::error::LocateError;
use crate::record::RawEntry;
use crate::types::RecordKind;

/// Entries buffered per worker thread before merging into the shared vector.
const ENTRY_BUFFER_CAPACITY: usize = 4096;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Traversal options for one walk invocation.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Follow symbolic links. Cycle detection is handled by the walker.
    pub follow_symlinks: bool,
    /// Log each skipped entry.
    pub verbose: bool,
    /// Worker pool size. Defaults to the available hardware parallelism.
    pub threads: Option<usize>,
    pub cancel: CancellationToken,
}

impl WalkOptions {
    fn resolved_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            available_parallelism().map(|n| n.get()).unwrap_or(4)
        })
    }
}

/// Result of walking one root.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Raw entries in discovery order (unordered across directories).
    pub entries: Vec<RawEntry>,
    /// Per-entry errors skipped during the walk.
    pub errors_skipped: usize,
    /// Whether the walk was cut short by cancellation.
    pub cancelled: bool,
}

// ---------------------------------------------------------------------------
// Per-thread entry buffer
// ---------------------------------------------------------------------------

/// Per-worker buffer that flushes into the shared vector in batches,
/// and once more on drop when the worker finishes.
struct EntryBuffer {
    local: Vec<RawEntry>,
    shared: Arc<Mutex<Vec<RawEntry>>>,
}

impl EntryBuffer {
    fn new(shared: Arc<Mutex<Vec<RawEntry>>>) -> Self {
        Self {
            local: Vec::with_capacity(ENTRY_BUFFER_CAPACITY),
            shared,
        }
    }

    fn push(&mut self, entry: RawEntry) {
        self.local.push(entry);
        if self.local.len() >= ENTRY_BUFFER_CAPACITY {
            self.shared.lock().append(&mut self.local);
        }
    }
}

impl Drop for EntryBuffer {
    fn drop(&mut self) {
        if !self.local.is_empty() {
            self.shared.lock().append(&mut self.local);
        }
    }
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

/// Walks one root in parallel, producing every reachable entry.
pub fn walk_root(root: &Path, options: &WalkOptions) -> WalkOutcome {
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .ignore(false)
        .parents(false)
        .hidden(false)
        .follow_links(options.follow_symlinks)
        .same_file_system(false)
        .threads(options.resolved_threads());

    let entries = Arc::new(Mutex::new(Vec::<RawEntry>::new()));
    let errors = Arc::new(AtomicUsize::new(0));

    builder.build_parallel().run(|| {
        let mut buffer = EntryBuffer::new(Arc::clone(&entries));
        let errors = Arc::clone(&errors);
        let cancel = options.cancel.clone();
        let verbose = options.verbose;

        Box::new(move |result: Result<DirEntry, ignore::Error>| -> WalkState {
            if cancel.is_cancelled().is_none() {
                return WalkState::Quit;
            }

            let entry = match result {
                Ok(entry) => entry,
                Err(error) => {
                    errors.fetch_add(1, Ordering::Relaxed);
                    if verbose {
                        log::warn!("walk skipped: {}", map_walk_error(error));
                    }
                    return WalkState::Continue;
                }
            };

            // No file type means the entry vanished mid-walk.
            let Some(file_type) = entry.file_type() else {
                errors.fetch_add(1, Ordering::Relaxed);
                if verbose {
                    log::warn!("walk skipped: no metadata for {}", entry.path().display());
                }
                return WalkState::Continue;
            };

            let kind = if file_type.is_dir() {
                RecordKind::Directory
            } else if file_type.is_file() {
                RecordKind::File
            } else if file_type.is_symlink() {
                RecordKind::Symlink
            } else {
                RecordKind::Other
            };

            // Size and mtime are best-effort: a metadata failure here still
            // yields a record, just without them.
            let (size_bytes, modified_at) = match entry.metadata() {
                Ok(metadata) => {
                    let size = if kind == RecordKind::File { metadata.len() } else { 0 };
                    (size, unix_mtime(&metadata))
                }
                Err(_) => (0, None),
            };

            buffer.push(RawEntry {
                path: entry.into_path(),
                kind,
                size_bytes,
                modified_at,
            });

            WalkState::Continue
        })
    });

    let cancelled = options.cancel.is_cancelled().is_none();
    let entries = Arc::try_unwrap(entries)
        .map(Mutex::into_inner)
        .unwrap_or_default();

    WalkOutcome {
        entries,
        errors_skipped: errors.load(Ordering::Relaxed),
        cancelled,
    }
}

fn unix_mtime(metadata: &std::fs::Metadata) -> Option<u64> {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|duration| duration.as_secs())
}

/// Maps a walker error into the typed taxonomy for logging.
fn map_walk_error(error: ignore::Error) -> LocateError {
    match error {
        ignore::Error::WithPath { path, err } => match *err {
            ignore::Error::Io(io_error) => LocateError::Traversal(format!(
                "{}: {}",
                path.display(),
                io_error
            )),
            other => LocateError::Traversal(format!("{}: {}", path.display(), other)),
        },
        ignore::Error::Loop { child, .. } => LocateError::Traversal(format!(
            "symlink loop at {}",
            child.display()
        )),
        ignore::Error::Io(io_error) => LocateError::Traversal(io_error.to_string()),
        other => LocateError::Traversal(other.to_string()),
    }
}
