//! Persistent filesystem location index.
//!
//! This crate finds files by name without re-walking the filesystem on
//! every lookup. An explicit update walks the configured roots in parallel
//! and commits the resulting path records as one atomic generation in a
//! durable store; queries translate user patterns (`*`/`?` wildcards, case
//! folding, basename-only) into predicates evaluated against the committed
//! snapshot.
//!
//! - Updates replace records per root, never append; readers always observe
//!   a complete generation (snapshot isolation).
//! - Per-entry filesystem errors are counted and skipped, never fatal.
//! - Results are ordered lexicographically by path and reproducible.

#![forbid(unsafe_code)]

pub mod cancel;
pub mod error;
pub mod executor;
pub mod manager;
pub mod pattern;
pub mod record;
pub mod store;
pub mod types;
pub mod walk;

// Re-export main types
pub use cancel::CancellationToken;
pub use error::{LocateError, Result};
pub use executor::QueryOutcome;
pub use manager::{IndexManager, QueryOptions, UpdateOptions};
pub use pattern::{Pattern, PatternToken, SearchPredicate};
pub use store::IndexStore;
pub use types::{IndexStats, PathRecord, RecordKind, RootSet, UpdateSummary};
