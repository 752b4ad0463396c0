use std::fs;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("traversal error: {0}")]
    Traversal(String),

    #[error("record error: {0}")]
    Record(String),

    #[error("index update already in progress for an overlapping root: {0}")]
    StoreLocked(PathBuf),

    #[error("index corrupt: {0}")]
    Corrupt(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LocateError {
    /// Whether indexing can continue past this error.
    ///
    /// Per-entry errors (traversal, record) are counted and skipped; the
    /// store-level errors abort the operation they occurred in.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Traversal(_) | Self::Record(_))
    }
}

pub type Result<T> = std::result::Result<T, LocateError>;

/// Canonicalizes a path, returning the original if canonicalization fails.
pub fn canonicalize_existing_path(path: PathBuf) -> PathBuf {
    fs::canonicalize(&path).unwrap_or(path)
}
