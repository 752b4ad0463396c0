//! Predicate execution against a committed generation.
//!
//! Records in a generation are sorted by `full_path`, so scanning ids in
//! ascending order visits matches in lexicographic path order. That makes
//! results deterministic across repeated queries and lets a `limit` stop
//! the scan early without biasing toward discovery order.

use crate::cancel::CancellationToken;
use crate::pattern::SearchPredicate;
use crate::store::{Generation, LINEAR_SCAN_THRESHOLD};
use crate::types::PathRecord;

/// The shaped result of one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Matching records, ordered lexicographically by `full_path`.
    Records(Vec<PathRecord>),
    /// Match count, for `count_only` queries.
    Count(usize),
}

impl QueryOutcome {
    pub fn len(&self) -> usize {
        match self {
            Self::Records(records) => records.len(),
            Self::Count(count) => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_records(self) -> Vec<PathRecord> {
        match self {
            Self::Records(records) => records,
            Self::Count(_) => Vec::new(),
        }
    }
}

/// Runs a predicate against a generation.
///
/// `limit` truncates the ordered result sequence; it applies to the count
/// as well, consistent with materialize-then-count. Returns `None` when
/// the query was cancelled - never a partial result.
pub fn execute(
    generation: &Generation,
    predicate: &SearchPredicate,
    limit: Option<usize>,
    count_only: bool,
    cancel: &CancellationToken,
) -> Option<QueryOutcome> {
    cancel.is_cancelled()?;

    // Candidate selection: trigram narrowing above the linear-scan
    // threshold, full scan otherwise or when the pattern has no usable
    // literal.
    let candidates = if generation.len() >= LINEAR_SCAN_THRESHOLD {
        let literals = predicate.required_literals();
        generation.trigrams().candidates(&literals, cancel)
    } else {
        None
    };

    cancel.is_cancelled()?;

    match candidates {
        Some(ids) => scan(
            ids.iter().filter_map(|id| generation.get(*id)),
            predicate,
            limit,
            count_only,
            cancel,
        ),
        None => scan(
            generation.records().iter(),
            predicate,
            limit,
            count_only,
            cancel,
        ),
    }
}

/// Scans candidates in id order, which is lexicographic path order.
fn scan<'a>(
    candidates: impl Iterator<Item = &'a PathRecord>,
    predicate: &SearchPredicate,
    limit: Option<usize>,
    count_only: bool,
    cancel: &CancellationToken,
) -> Option<QueryOutcome> {
    let mut records = Vec::new();
    let mut count = 0usize;

    for (i, record) in candidates.enumerate() {
        cancel.is_cancelled_sparse(i)?;

        if !predicate.matches(record) {
            continue;
        }
        count += 1;
        if !count_only {
            records.push(record.clone());
        }
        if limit.is_some_and(|limit| count >= limit) {
            break;
        }
    }

    Some(if count_only {
        QueryOutcome::Count(count)
    } else {
        QueryOutcome::Records(records)
    })
}
