//! Durable, queryable storage of path records.
//!
//! The store is a single owned resource around one snapshot file. Readers
//! take an `Arc` of the current committed [`Generation`] and never block on
//! writers; a writer opens a scoped [`UpdateHandle`], buffers records, and
//! publishes everything at commit by persisting the merged generation and
//! swapping the shared pointer. Anything short of commit - drop, abort,
//! persistence failure - leaves the prior generation fully intact on disk
//! and in memory.
//!
//! One update may be open per overlapping root at a time; a conflicting
//! `begin_update` fails with [`LocateError::StoreLocked`]. The lock is
//! released on every exit path through the handle's `Drop`.

mod generation;
mod persistence;
mod trigram;

pub use generation::Generation;
pub use trigram::LINEAR_SCAN_THRESHOLD;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};

use crate::error::{LocateError, Result};
use crate::types::{IndexStats, PathRecord, RootSet};

/// Returns the current Unix timestamp in seconds.
pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_secs())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// IndexStore
// ---------------------------------------------------------------------------

pub struct IndexStore {
    path: PathBuf,
    current: RwLock<Arc<Generation>>,
    /// Roots of in-flight updates, for overlap conflict detection.
    active_update_roots: Mutex<Vec<PathBuf>>,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("path", &self.path)
            .field("records", &self.current.read().len())
            .finish()
    }
}

impl IndexStore {
    /// Opens the store at `path`, restoring the last committed generation.
    ///
    /// A missing snapshot file yields an empty index. A snapshot that fails
    /// integrity checks yields [`LocateError::Corrupt`]; recovery requires
    /// an explicit rebuild via [`IndexStore::create`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let generation = match persistence::load_snapshot(&path)? {
            Some(snapshot) => Arc::new(Generation::assemble(
                snapshot.records,
                snapshot.roots,
                snapshot.stamp,
            )),
            None => Arc::new(Generation::empty()),
        };

        Ok(Self {
            path,
            current: RwLock::new(generation),
            active_update_roots: Mutex::new(Vec::new()),
        })
    }

    /// Creates an empty store at `path`, discarding any existing snapshot.
    /// This is the explicit rebuild path for a corrupt index.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(Generation::empty())),
            active_update_roots: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current committed generation. Holding the returned `Arc` gives
    /// snapshot isolation: commits swap the pointer, they never mutate a
    /// published generation.
    pub fn snapshot(&self) -> Arc<Generation> {
        Arc::clone(&self.current.read())
    }

    /// Opens a scoped write transaction for `roots`.
    pub fn begin_update(&self, roots: RootSet) -> Result<UpdateHandle<'_>> {
        let mut active = self.active_update_roots.lock();
        if roots.overlaps(&active) {
            let conflicting = roots
                .roots()
                .first()
                .cloned()
                .unwrap_or_else(|| self.path.clone());
            return Err(LocateError::StoreLocked(conflicting));
        }
        active.extend(roots.roots().iter().cloned());
        drop(active);

        Ok(UpdateHandle {
            store: self,
            roots,
            buffered: Vec::new(),
        })
    }

    pub fn stats(&self) -> IndexStats {
        let generation = self.snapshot();
        IndexStats {
            record_count: generation.len(),
            root_count: generation.roots().len(),
            generation_timestamp: generation.stamp(),
            size_bytes_on_disk: fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0),
        }
    }

    fn release_roots(&self, roots: &RootSet) {
        let mut active = self.active_update_roots.lock();
        active.retain(|root| !roots.roots().contains(root));
    }

    fn commit_generation(&self, next: Generation) -> Result<()> {
        // Persist first: a failed write must leave the published generation
        // untouched in memory and on disk.
        persistence::write_snapshot(&self.path, &next)?;
        *self.current.write() = Arc::new(next);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UpdateHandle
// ---------------------------------------------------------------------------

/// A scoped write transaction over one set of roots.
///
/// Records buffer in the handle; nothing is visible to readers or durable
/// on disk until [`commit`](UpdateHandle::commit). Dropping the handle
/// without committing discards the buffered records and releases the root
/// locks.
pub struct UpdateHandle<'a> {
    store: &'a IndexStore,
    roots: RootSet,
    buffered: Vec<PathRecord>,
}

impl UpdateHandle<'_> {
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    /// Buffers one record under this update.
    pub fn write_record(&mut self, record: PathRecord) {
        self.buffered.push(record);
    }

    /// Number of records buffered so far.
    pub fn buffered_len(&self) -> usize {
        self.buffered.len()
    }

    /// Atomically replaces all stored records under this update's roots
    /// with the buffered set and publishes the new generation.
    pub fn commit(mut self) -> Result<()> {
        let records = std::mem::take(&mut self.buffered);
        let prior = self.store.snapshot();
        let next =
            Generation::merge_update(&prior, &self.roots, records, unix_now_secs());

        let committed = next.len();
        self.store.commit_generation(next)?;
        log::info!(
            "index commit path={} roots={} records={}",
            self.store.path().display(),
            self.roots.len(),
            committed,
        );
        Ok(())
        // Drop releases the root locks.
    }

    /// Discards the update. Equivalent to dropping the handle.
    pub fn abort(self) {}
}

impl Drop for UpdateHandle<'_> {
    fn drop(&mut self) {
        self.store.release_roots(&self.roots);
    }
}
