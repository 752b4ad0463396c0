//! Trigram posting lists over indexed paths.
//!
//! Every record's case-folded `full_path` contributes its 3-byte windows to
//! a postings map; a query's required literals are folded the same way and
//! intersected across their trigrams to produce a small candidate set the
//! executor then verifies against the full predicate. Folding both sides
//! identically keeps the candidate set a superset of the true matches in
//! both case modes.
//!
//! Below [`LINEAR_SCAN_THRESHOLD`] records the executor scans linearly and
//! this structure is consulted only above it.

use fnv::FnvHashMap;
use rayon::prelude::*;

use crate::cancel::CancellationToken;
use crate::types::PathRecord;

/// Record count below which a linear scan is used instead of the postings.
pub const LINEAR_SCAN_THRESHOLD: usize = 4096;

/// Records per parallel build chunk.
const BUILD_CHUNK: usize = 16 * 1024;

/// Posting lists mapping each trigram to the ascending record ids whose
/// folded path contains it.
#[derive(Debug, Default)]
pub struct TrigramIndex {
    postings: FnvHashMap<[u8; 3], Vec<u32>>,
}

impl TrigramIndex {
    /// Builds the postings from records, in parallel chunks merged in order
    /// so every posting list stays sorted ascending.
    pub fn build(records: &[PathRecord]) -> Self {
        let chunk_maps: Vec<FnvHashMap<[u8; 3], Vec<u32>>> = records
            .par_chunks(BUILD_CHUNK)
            .enumerate()
            .map(|(chunk_index, chunk)| {
                let base = (chunk_index * BUILD_CHUNK) as u32;
                let mut map: FnvHashMap<[u8; 3], Vec<u32>> = FnvHashMap::default();
                for (offset, record) in chunk.iter().enumerate() {
                    let id = base + offset as u32;
                    let folded = record.full_path.to_lowercase();
                    for trigram in trigrams_of(folded.as_bytes()) {
                        let ids = map.entry(trigram).or_default();
                        // Dedup within one record: windows repeat in paths
                        // like "aaaa".
                        if ids.last() != Some(&id) {
                            ids.push(id);
                        }
                    }
                }
                map
            })
            .collect();

        let mut postings: FnvHashMap<[u8; 3], Vec<u32>> = FnvHashMap::default();
        for map in chunk_maps {
            for (trigram, mut ids) in map {
                postings.entry(trigram).or_default().append(&mut ids);
            }
        }

        Self { postings }
    }

    /// Candidate record ids for the given required literals.
    ///
    /// Returns `None` when no literal yields a usable trigram (the caller
    /// must fall back to a full scan); otherwise the sorted intersection of
    /// every trigram's posting list. An absent trigram means no record can
    /// match, yielding an empty candidate set.
    pub fn candidates(
        &self,
        literals: &[&str],
        cancel: &CancellationToken,
    ) -> Option<Vec<u32>> {
        let mut intersection: Option<Vec<u32>> = None;
        let mut usable = false;

        for literal in literals {
            let folded = literal.to_lowercase();
            for trigram in trigrams_of(folded.as_bytes()) {
                usable = true;
                let ids = match self.postings.get(&trigram) {
                    Some(ids) => ids,
                    None => return Some(Vec::new()),
                };
                intersection = Some(match intersection {
                    None => ids.clone(),
                    Some(existing) => intersect_sorted_ids(&existing, ids, cancel),
                });
                if intersection.as_ref().is_some_and(Vec::is_empty) {
                    return Some(Vec::new());
                }
            }
        }

        if usable {
            intersection
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

/// All 3-byte windows of `bytes`.
fn trigrams_of(bytes: &[u8]) -> impl Iterator<Item = [u8; 3]> + '_ {
    bytes.windows(3).map(|window| [window[0], window[1], window[2]])
}

/// Intersects two sorted id slices.
fn intersect_sorted_ids(left: &[u32], right: &[u32], cancel: &CancellationToken) -> Vec<u32> {
    let mut result = Vec::new();
    let mut i = 0usize;
    let mut j = 0usize;
    let mut counter = 0usize;
    while i < left.len() && j < right.len() {
        // Sparse cancellation check: a cancelled query can stop narrowing,
        // the executor re-checks before using the result.
        if cancel.is_cancelled_sparse(counter).is_none() {
            return result;
        }
        counter += 1;

        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Equal => {
                result.push(left[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    result
}
