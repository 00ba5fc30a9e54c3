//! Cancellation tokens for in-flight scans.
//!
//! Cancellation is version-based: each new search bumps the active version,
//! and tokens minted for older versions report cancelled the next time they
//! are checked. Checks are cooperative — workers test the token at the top of
//! each traversal or file-read step and simply stop producing results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tracks the active search version.
///
/// Call [`next_version`](Self::next_version) before starting a search; any
/// older in-flight search observes the bump through its token and winds down.
#[derive(Debug, Clone, Default)]
pub struct SearchVersionTracker {
    active_version: Arc<AtomicU64>,
}

impl SearchVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the active version and returns it, cancelling every token
    /// minted for an earlier version.
    pub fn next_version(&self) -> u64 {
        self.active_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the current active version without incrementing.
    pub fn current_version(&self) -> u64 {
        self.active_version.load(Ordering::SeqCst)
    }

    /// Creates a cancellation token bound to the given version.
    pub fn token_for_version(&self, version: u64) -> CancellationToken {
        CancellationToken {
            active_version: self.active_version.clone(),
            version,
        }
    }
}

/// A cancellation token for terminating long-running work early.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    active_version: Arc<AtomicU64>,
    version: u64,
}

impl CancellationToken {
    /// A token that is never cancelled. Useful for tests and synchronous
    /// one-shot searches.
    pub fn noop() -> Self {
        Self {
            active_version: Arc::new(AtomicU64::new(0)),
            version: 0,
        }
    }

    /// `Some(())` while still active, `None` once cancelled. The option form
    /// lets workers bail out with the `?` operator.
    #[inline]
    pub fn is_cancelled(&self) -> Option<()> {
        if self.version != self.active_version.load(Ordering::Relaxed) {
            None
        } else {
            Some(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::noop()
    }
}
