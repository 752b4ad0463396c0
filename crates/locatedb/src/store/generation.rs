//! Committed index generations.
//!
//! A [`Generation`] is an immutable snapshot of every record committed by
//! one update, plus the derived trigram postings. Records are sorted by
//! `full_path`, so record ids (positions) enumerate in lexicographic path
//! order - the executor relies on this for deterministic results and for
//! applying limits without ordering bias.

use std::path::PathBuf;

use crate::types::{PathRecord, RootSet};

use super::trigram::TrigramIndex;

#[derive(Debug)]
pub struct Generation {
    /// All records, sorted by `full_path`, unique per path.
    records: Vec<PathRecord>,
    /// Every root represented in this generation.
    roots: Vec<PathBuf>,
    /// Unix seconds of the commit that produced this generation.
    stamp: Option<u64>,
    trigrams: TrigramIndex,
}

impl Generation {
    /// A fresh generation with nothing indexed.
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            roots: Vec::new(),
            stamp: None,
            trigrams: TrigramIndex::default(),
        }
    }

    /// Assembles a generation from records: sorts by path, drops duplicate
    /// paths, and builds the trigram postings.
    pub fn assemble(mut records: Vec<PathRecord>, mut roots: Vec<PathBuf>, stamp: u64) -> Self {
        records.sort_by(|a, b| a.full_path.cmp(&b.full_path));
        records.dedup_by(|a, b| a.full_path == b.full_path);
        roots.sort();
        roots.dedup();
        let trigrams = TrigramIndex::build(&records);
        Self {
            records,
            roots,
            stamp: Some(stamp),
            trigrams,
        }
    }

    /// Produces the successor generation for an update scoped to
    /// `update_roots`: prior records under any update root are replaced by
    /// `new_records`, records under other roots carry over unchanged.
    pub fn merge_update(
        prior: &Generation,
        update_roots: &RootSet,
        new_records: Vec<PathRecord>,
        stamp: u64,
    ) -> Self {
        let mut records: Vec<PathRecord> = prior
            .records
            .iter()
            .filter(|record| {
                !update_roots
                    .roots()
                    .iter()
                    .any(|root| record.is_under(root))
            })
            .cloned()
            .collect();
        records.extend(new_records);

        // A prior root swallowed by an update root is no longer a distinct
        // generation root.
        let mut roots: Vec<PathBuf> = prior
            .roots
            .iter()
            .filter(|root| {
                !update_roots
                    .roots()
                    .iter()
                    .any(|update_root| root.starts_with(update_root))
            })
            .cloned()
            .collect();
        roots.extend(update_roots.roots().iter().cloned());

        Self::assemble(records, roots, stamp)
    }

    pub fn records(&self) -> &[PathRecord] {
        &self.records
    }

    pub fn get(&self, id: u32) -> Option<&PathRecord> {
        self.records.get(id as usize)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn stamp(&self) -> Option<u64> {
        self.stamp
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn trigrams(&self) -> &TrigramIndex {
        &self.trigrams
    }
}
