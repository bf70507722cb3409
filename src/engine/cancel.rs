//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a cheap handle onto a shared flag that callers may
//! set from any thread. Each run wraps it in a [`StopSignal`] together with
//! that run's deadline. Workers poll [`StopSignal::should_stop`] between
//! subjects and between chunks; nothing inside an extension looks at it.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the search stop at the next subject boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Acquire)
    }

    /// Clear a request once the run it stopped has finished
    pub(crate) fn reset(&self) {
        self.cancelled.store(false, AtomicOrdering::Release);
    }
}

/// Stop conditions of one run: the caller's token and the run's own deadline
#[derive(Debug)]
pub struct StopSignal {
    token: CancelToken,
    deadline: Option<Instant>,
    timed_out: AtomicBool,
}

impl StopSignal {
    /// The deadline, if any, starts counting now
    pub fn new(token: CancelToken, timeout: Option<Duration>) -> Self {
        Self {
            token,
            deadline: timeout.map(|t| Instant::now() + t),
            timed_out: AtomicBool::new(false),
        }
    }

    pub fn should_stop(&self) -> bool {
        if self.timed_out.load(AtomicOrdering::Acquire) || self.token.is_cancelled() {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.timed_out.store(true, AtomicOrdering::Release);
                true
            }
            _ => false,
        }
    }

    /// The stop was caused by the deadline
    pub fn timed_out(&self) -> bool {
        self.timed_out.load(AtomicOrdering::Acquire)
    }

    /// Stopped for any reason
    pub fn is_stopped(&self) -> bool {
        self.timed_out() || self.token.is_cancelled()
    }
}
