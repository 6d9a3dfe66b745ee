//! Control block for four-phase pipeline loops.
//!
//! Holds the phase state, the wake signal an idle loop parks on, an idle
//! signal posted whenever the loop quiesces, and the shutdown flag checked at
//! every suspension point.

use super::signal::Signal;
use super::state::{PhaseState, StateCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct PhaseControl {
    state: StateCell<PhaseState>,
    wake: Signal,
    idle: Signal,
    shutdown: AtomicBool,
}

impl PhaseControl {
    pub fn new() -> Self {
        Self {
            state: StateCell::new(PhaseState::Idle),
            wake: Signal::new(),
            idle: Signal::new(),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> PhaseState {
        self.state.get()
    }

    /// Enter `Begin` and wake the loop. No effect while already begun or running.
    pub fn request_begin(&self) -> bool {
        let mut entered = false;
        self.state.update(|s| match s {
            PhaseState::Idle | PhaseState::Finish => {
                entered = true;
                Some(PhaseState::Begin)
            }
            PhaseState::Begin | PhaseState::Running => None,
        });
        if entered {
            self.idle.clear();
            self.wake.notify();
        }
        entered
    }

    /// Enter `Finish` from `Begin` or `Running` and wake the loop.
    pub fn request_finish(&self) -> bool {
        let mut entered = false;
        self.state.update(|s| match s {
            PhaseState::Begin | PhaseState::Running => {
                entered = true;
                Some(PhaseState::Finish)
            }
            PhaseState::Idle | PhaseState::Finish => None,
        });
        if entered {
            self.wake.notify();
        }
        entered
    }

    /// Loop side: `Begin` -> `Running`.
    pub fn enter_running(&self) -> bool {
        self.state.transition(PhaseState::Begin, PhaseState::Running)
    }

    /// Loop side: `from` -> `Idle`, announcing quiescence.
    pub fn enter_idle(&self, from: PhaseState) -> bool {
        let entered = self.state.transition(from, PhaseState::Idle);
        if entered {
            self.idle.notify();
        }
        entered
    }

    /// Loop side: abandon a `Begin` that failed, even if a stop already moved
    /// it to `Finish`. The `Finish` work is skipped.
    pub fn abort_to_idle(&self) -> bool {
        let mut entered = false;
        self.state.update(|s| match s {
            PhaseState::Begin | PhaseState::Finish => {
                entered = true;
                Some(PhaseState::Idle)
            }
            PhaseState::Idle | PhaseState::Running => None,
        });
        if entered {
            self.idle.notify();
        }
        entered
    }

    /// Loop side: park until woken.
    pub fn park(&self) {
        self.wake.wait();
    }

    /// Wait until the loop reports `Idle`. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.state() == PhaseState::Idle {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.idle.wait_timeout(deadline - now);
        }
    }

    pub fn shut_down(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wake.notify();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Default for PhaseControl {
    fn default() -> Self {
        Self::new()
    }
}
