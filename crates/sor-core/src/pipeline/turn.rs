//! Single-slot turn-in-progress lock.
//!
//! The pipeline serializes all sends application-wide: while a turn is in
//! flight every new send is rejected, whatever session it targets. The
//! slot is held through an RAII guard, so it is released on every terminal
//! state -- settled, aborted, or the turn future dropped mid-await.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Explicit single-slot lock guarding the one in-flight generation turn.
#[derive(Debug, Clone, Default)]
pub struct TurnLock {
    in_flight: Arc<AtomicBool>,
}

/// Holds the turn slot; dropping it frees the slot.
#[derive(Debug)]
pub struct TurnGuard {
    in_flight: Arc<AtomicBool>,
}

impl TurnLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a turn is currently in flight.
    pub fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Take the slot. Returns `None` when a turn is already in flight.
    pub fn try_acquire(&self) -> Option<TurnGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TurnGuard {
                in_flight: Arc::clone(&self.in_flight),
            })
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
