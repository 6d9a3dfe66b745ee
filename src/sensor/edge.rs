//! Latched step-edge detector.
//!
//! An external edge (a step button or footswitch) calls [`EdgeDetector::trigger`].
//! The first trigger latches a pending flag and disarms the detector, so bounce
//! within one sampling period counts once. The sampling loop calls
//! [`EdgeDetector::take`], which reads and clears the flag and re-arms.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct EdgeState {
    pending: AtomicBool,
    armed: AtomicBool,
}

/// Cloneable handle to a shared edge latch.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    state: Arc<EdgeState>,
}

impl EdgeDetector {
    /// Create an armed detector with no pending edge.
    pub fn new() -> Self {
        Self {
            state: Arc::new(EdgeState {
                pending: AtomicBool::new(false),
                armed: AtomicBool::new(true),
            }),
        }
    }

    /// Record an edge. Ignored while disarmed. Returns `true` if latched.
    pub fn trigger(&self) -> bool {
        if self
            .state
            .armed
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.state.pending.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Read and clear the latched edge. Re-arms the detector if an edge was
    /// pending.
    pub fn take(&self) -> bool {
        let pending = self.state.pending.swap(false, Ordering::AcqRel);
        if pending {
            self.state.armed.store(true, Ordering::Release);
        }
        pending
    }

    pub fn is_armed(&self) -> bool {
        self.state.armed.load(Ordering::Acquire)
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}
