//! Fixed-size sample window.
//!
//! The buffer is allocated once and overwritten in place every window. A
//! window is complete when the write position wraps back to zero; only then
//! is the buffer handed to the predictor.

use crate::sensor::types::Sample;

/// Reusable window buffer of `capacity` samples.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    samples: Vec<Sample>,
    write_index: usize,
}

impl WindowBuffer {
    /// Create a zero-filled buffer. `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![Sample::default(); capacity.max(1)],
            write_index: 0,
        }
    }

    /// Write `sample` at the current position and advance.
    ///
    /// Returns `true` when this write completed the window.
    pub fn push(&mut self, sample: Sample) -> bool {
        self.samples[self.write_index] = sample;
        self.write_index = (self.write_index + 1) % self.samples.len();
        self.write_index == 0
    }

    /// Position the next sample will be written to.
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// All samples in write order. Meaningful as a window only right after
    /// `push` returned `true`.
    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }
}
