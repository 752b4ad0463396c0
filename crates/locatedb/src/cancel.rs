//! Cancellation tokens for traversal and query operations.
//!
//! ## Sparse Checking
//!
//! For tight loops over large indexes, `is_cancelled_sparse()` only checks
//! every 65,536 iterations to minimize atomic read overhead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How often long-running loops should check whether execution was cancelled.
/// A power of 2 allows efficient modulo via bitwise AND.
pub const CANCEL_CHECK_INTERVAL: usize = 0x10000; // 65,536

/// A cancellation token for terminating long-running operations.
///
/// Clones share the same flag: cancelling any clone cancels them all.
/// A cancelled walk discards everything it produced; a cancelled query
/// returns no result.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every operation holding a clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Checks if this token is still active.
    ///
    /// Returns `Some(())` if still active, `None` if cancelled.
    /// This enables use with the `?` operator for early returns.
    #[inline]
    pub fn is_cancelled(&self) -> Option<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            None
        } else {
            Some(())
        }
    }

    /// Sparse cancellation check - only checks every `CANCEL_CHECK_INTERVAL`
    /// iterations. The maximum latency before noticing cancellation is
    /// ~65,536 iterations.
    #[inline]
    pub fn is_cancelled_sparse(&self, counter: usize) -> Option<()> {
        if counter & (CANCEL_CHECK_INTERVAL - 1) == 0 {
            self.is_cancelled()
        } else {
            Some(())
        }
    }
}
