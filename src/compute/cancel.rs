//! Cooperative cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared cancellation flag with an optional deadline.
///
/// Clones observe the same flag, so one handle can be moved to another
/// thread (or a signal handler) and cancel work running elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is never cancelled until `cancel` is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also cancels itself after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_timeout_expires() {
        let token = CancelToken::with_timeout(Duration::from_millis(0));
        assert!(token.is_cancelled());
        assert_eq!(token.remaining(), Some(Duration::ZERO));

        let token = CancelToken::with_timeout(Duration::from_secs(60));
        assert!(!token.is_cancelled());
        assert!(CancelToken::new().remaining().is_none());
    }
}
