//! Single-slot wake signal.
//!
//! A `Signal` behaves like a binary semaphore: any number of `notify` calls
//! made while nobody is waiting collapse into one pending wake-up, and a
//! waiter consumes it. Built on a capacity-1 channel so that waiting parks the
//! thread instead of polling.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;

/// Saturating wake-up notification shared between threads.
#[derive(Debug, Clone)]
pub struct Signal {
    sender: Sender<()>,
    receiver: Receiver<()>,
}

impl Signal {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(1);
        Self { sender, receiver }
    }

    /// Post a wake-up. Returns `false` if one was already pending.
    pub fn notify(&self) -> bool {
        match self.sender.try_send(()) {
            Ok(()) => true,
            // Already pending; wake count saturates at one.
            Err(TrySendError::Full(())) => false,
            // Both ends live in `self`, so this cannot happen while we exist.
            Err(TrySendError::Disconnected(())) => false,
        }
    }

    /// Block until a wake-up is available and consume it.
    pub fn wait(&self) {
        let _ = self.receiver.recv();
    }

    /// Block for at most `timeout`. Returns `true` if a wake-up was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Receiving end, for waiting on this signal alongside other channels.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }

    /// Drop a pending wake-up without blocking. Returns `true` if one was pending.
    pub fn clear(&self) -> bool {
        self.receiver.try_recv().is_ok()
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
