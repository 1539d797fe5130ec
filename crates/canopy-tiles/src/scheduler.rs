//! Admission control for concurrent content requests.
//!
//! One [`RequestScheduler`] is shared by every tile of every hierarchy that
//! should draw from the same transport budget, nested hierarchies included.
//! Admission hands out a [`RequestSlot`] guard; dropping the guard returns the
//! slot, so each admission is released exactly once whatever the outcome.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default bound on in-flight requests.
pub const DEFAULT_MAX_PENDING_REQUESTS: usize = 6;

/// Bounds the number of content requests in flight.
#[derive(Debug)]
pub struct RequestScheduler {
    pending: AtomicUsize,
    max_pending: usize,
}

impl RequestScheduler {
    /// Create a scheduler admitting at most `max_pending` concurrent requests.
    pub fn new(max_pending: usize) -> Arc<Self> {
        Arc::new(Self {
            pending: AtomicUsize::new(0),
            max_pending,
        })
    }

    /// Returns `true` if another request may be admitted.
    pub fn has_capacity(&self) -> bool {
        self.pending.load(Ordering::Acquire) < self.max_pending
    }

    /// Admit one request if capacity remains.
    ///
    /// The returned slot must be held until the request reaches a terminal
    /// outcome; dropping it releases the capacity.
    pub fn try_admit(self: &Arc<Self>) -> Option<RequestSlot> {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                (pending < self.max_pending).then_some(pending + 1)
            })
            .ok()
            .map(|_| RequestSlot {
                scheduler: Arc::clone(self),
            })
    }

    /// Number of admitted requests not yet released.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Maximum number of concurrent requests.
    pub fn max_pending(&self) -> usize {
        self.max_pending
    }

    fn release(&self) {
        let previous = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "request slot released twice");
    }
}

/// An admitted request. Releases its scheduler slot on drop.
#[derive(Debug)]
pub struct RequestSlot {
    scheduler: Arc<RequestScheduler>,
}

impl Drop for RequestSlot {
    fn drop(&mut self) {
        self.scheduler.release();
    }
}
