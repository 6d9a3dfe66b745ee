//! Component state enums and the cell they live in.
//!
//! Each component's loop thread and its controlling `start()`/`stop()` calls
//! share one [`StateCell`]. Transitions go through the cell so they are never
//! observed half-applied.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// Two-phase state of the sample source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceState {
    Idle,
    Running,
}

/// Four-phase state shared by the step counter, the raw forwarder and the
/// session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseState {
    Idle,
    Begin,
    Running,
    Finish,
}

impl std::fmt::Display for PhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PhaseState::Idle => "idle",
            PhaseState::Begin => "begin",
            PhaseState::Running => "running",
            PhaseState::Finish => "finish",
        };
        f.write_str(name)
    }
}

/// Mutex-guarded state value with atomic compare-and-set transitions.
#[derive(Debug)]
pub struct StateCell<S: Copy + PartialEq> {
    inner: Mutex<S>,
}

impl<S: Copy + PartialEq> StateCell<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    pub fn get(&self) -> S {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, state: S) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Move to `to` only if the current state is `from`.
    pub fn transition(&self, from: S, to: S) -> bool {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if *guard == from {
            *guard = to;
            true
        } else {
            false
        }
    }

    /// Apply `f` to the current state under the lock; `Some(next)` replaces it.
    /// Returns the state after the call.
    pub fn update(&self, f: impl FnOnce(S) -> Option<S>) -> S {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = f(*guard) {
            *guard = next;
        }
        *guard
    }
}
