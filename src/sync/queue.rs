//! Bounded sample queue between the sampling loop and the active pipeline.
//!
//! Single producer, single consumer, FIFO. Capacity is fixed at creation and
//! never exceeded: a push past capacity waits up to its timeout and then
//! fails instead of overwriting.

use crate::sensor::types::Sample;
use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError,
};
use std::time::Duration;

/// Errors from queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// Queue stayed full for the whole push timeout
    Full,
    /// Queue stayed empty for the whole pop timeout
    Timeout,
    /// Non-blocking pop found nothing
    Empty,
    /// The other end of the queue is gone
    Disconnected,
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::Full => write!(f, "Queue full past timeout"),
            QueueError::Timeout => write!(f, "Queue empty past timeout"),
            QueueError::Empty => write!(f, "Queue empty"),
            QueueError::Disconnected => write!(f, "Queue disconnected"),
        }
    }
}

impl std::error::Error for QueueError {}

/// Create a queue with room for `capacity` samples.
pub fn sample_queue(capacity: usize) -> (SampleProducer, SampleConsumer) {
    let (sender, receiver) = bounded(capacity);
    (
        SampleProducer { sender, capacity },
        SampleConsumer { receiver, capacity },
    )
}

/// Producing end, owned by the sampling loop.
#[derive(Debug)]
pub struct SampleProducer {
    sender: Sender<Sample>,
    capacity: usize,
}

impl SampleProducer {
    /// Push, waiting at most `timeout` for room.
    pub fn push(&self, sample: Sample, timeout: Duration) -> Result<(), QueueError> {
        self.sender
            .send_timeout(sample, timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => QueueError::Full,
                SendTimeoutError::Disconnected(_) => QueueError::Disconnected,
            })
    }

    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consuming end, owned by whichever pipeline is active.
#[derive(Debug)]
pub struct SampleConsumer {
    receiver: Receiver<Sample>,
    capacity: usize,
}

impl SampleConsumer {
    /// Pop the oldest sample, waiting at most `timeout`.
    pub fn pop(&self, timeout: Duration) -> Result<Sample, QueueError> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => QueueError::Timeout,
            RecvTimeoutError::Disconnected => QueueError::Disconnected,
        })
    }

    /// Pop the oldest sample if one is queued right now.
    pub fn try_pop(&self) -> Result<Sample, QueueError> {
        self.receiver.try_recv().map_err(|e| match e {
            TryRecvError::Empty => QueueError::Empty,
            TryRecvError::Disconnected => QueueError::Disconnected,
        })
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
