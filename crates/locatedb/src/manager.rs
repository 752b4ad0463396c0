//! IndexManager - main API over the location index.
//!
//! Owns the [`IndexStore`] and exposes the three operation surfaces the
//! CLI consumes: `update` (walk roots and commit a new generation),
//! `query` (translate a pattern and execute it against the committed
//! snapshot), and `stats`.

use std::path::PathBuf;
use std::time::Instant;

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::executor::{self, QueryOutcome};
use crate::pattern::{Pattern, SearchPredicate};
use crate::record::normalize_entry;
use crate::store::IndexStore;
use crate::types::{IndexStats, RootSet, UpdateSummary};
use crate::walk::{walk_root, WalkOptions};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options for one update invocation.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub follow_symlinks: bool,
    /// Log each skipped entry during the walk.
    pub verbose: bool,
    /// Walker pool size; defaults to the available hardware parallelism.
    pub threads: Option<usize>,
    pub cancel: CancellationToken,
}

/// Options for one query invocation.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub case_sensitive: bool,
    pub basename_only: bool,
    pub limit: Option<usize>,
    pub count_only: bool,
    pub cancel: CancellationToken,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            basename_only: false,
            limit: None,
            count_only: false,
            cancel: CancellationToken::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// IndexManager
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct IndexManager {
    store: IndexStore,
}

impl IndexManager {
    /// Opens the index at `path`. See [`IndexStore::open`] for the corrupt
    /// and missing-file behavior.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            store: IndexStore::open(path)?,
        })
    }

    /// Creates an empty index at `path`, discarding any existing snapshot.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            store: IndexStore::create(path)?,
        })
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Rebuilds the index for `roots`: walks each root, normalizes entries
    /// into records, and commits them as one atomic generation. Records
    /// under roots not named here carry over from the prior generation.
    ///
    /// Returns `Ok(None)` when cancelled; the uncommitted update is
    /// discarded entirely.
    pub fn update(
        &self,
        roots: Vec<PathBuf>,
        options: &UpdateOptions,
    ) -> Result<Option<UpdateSummary>> {
        let started = Instant::now();
        let root_set = RootSet::new(roots);
        if root_set.is_empty() {
            log::warn!("index update skipped: no usable roots");
            return Ok(Some(UpdateSummary {
                records_indexed: 0,
                errors_skipped: 0,
                duration: started.elapsed(),
            }));
        }

        let mut update = self.store.begin_update(root_set)?;
        let walk_options = WalkOptions {
            follow_symlinks: options.follow_symlinks,
            verbose: options.verbose,
            threads: options.threads,
            cancel: options.cancel.clone(),
        };

        let mut errors_skipped = 0usize;
        for root in update.roots().roots().to_vec() {
            let outcome = walk_root(&root, &walk_options);
            errors_skipped += outcome.errors_skipped;
            if outcome.cancelled {
                update.abort();
                log::info!("index update cancelled root={}", root.display());
                return Ok(None);
            }

            for raw in outcome.entries {
                match normalize_entry(raw, &root) {
                    Ok(record) => update.write_record(record),
                    Err(error) => {
                        errors_skipped += 1;
                        if options.verbose {
                            log::warn!("record skipped: {error}");
                        }
                    }
                }
            }
        }

        if options.cancel.is_cancelled().is_none() {
            update.abort();
            return Ok(None);
        }

        let records_indexed = update.buffered_len();
        update.commit()?;

        let summary = UpdateSummary {
            records_indexed,
            errors_skipped,
            duration: started.elapsed(),
        };
        log::info!(
            "index update committed records={} errors={} elapsed_ms={}",
            summary.records_indexed,
            summary.errors_skipped,
            summary.duration.as_millis(),
        );
        Ok(Some(summary))
    }

    /// Translates `pattern` and executes it against the current committed
    /// generation. Returns `Ok(None)` when cancelled.
    pub fn query(&self, pattern: &str, options: &QueryOptions) -> Result<Option<QueryOutcome>> {
        let predicate = SearchPredicate::translate(
            &Pattern::new(pattern)
                .case_sensitive(options.case_sensitive)
                .basename_only(options.basename_only),
        )?;
        let generation = self.store.snapshot();
        Ok(executor::execute(
            &generation,
            &predicate,
            options.limit,
            options.count_only,
            &options.cancel,
        ))
    }

    pub fn stats(&self) -> IndexStats {
        self.store.stats()
    }
}
