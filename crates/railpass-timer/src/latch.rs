//! One-way "logout already triggered" flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A latch that at most one caller can win per session.
///
/// [`try_acquire`](Self::try_acquire) is an atomic compare-and-set, so when
/// the scheduler and the watchdog reach the timeout on the same tick
/// exactly one of them gets `true`. The session layer releases the latch
/// when a new authenticated session begins.
#[derive(Debug, Clone, Default)]
pub struct LogoutLatch {
    triggered: Arc<AtomicBool>,
}

impl LogoutLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latch. Returns `true` only for the caller that flipped it.
    pub fn try_acquire(&self) -> bool {
        self.triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Clears the latch for the next session.
    pub fn release(&self) {
        self.triggered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_acquire_only_first_caller_wins() {
        let latch = LogoutLatch::new();
        assert!(latch.try_acquire());
        assert!(!latch.try_acquire());
        assert!(latch.is_set());
    }

    #[test]
    fn test_release_allows_next_session_to_acquire() {
        let latch = LogoutLatch::new();
        assert!(latch.try_acquire());
        latch.release();
        assert!(!latch.is_set());
        assert!(latch.try_acquire());
    }

    #[test]
    fn test_clones_share_state() {
        let latch = LogoutLatch::new();
        let other = latch.clone();
        assert!(other.try_acquire());
        assert!(!latch.try_acquire());
    }

    #[test]
    fn test_concurrent_acquire_has_single_winner() {
        let latch = LogoutLatch::new();
        let winners: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| latch.try_acquire()))
                .collect();
            handles
                .into_iter()
                .map(|h| usize::from(h.join().unwrap()))
                .sum()
        });
        assert_eq!(winners, 1);
    }
}
