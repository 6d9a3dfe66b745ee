//! Cross-thread plumbing shared by every pipeline component.
//!
//! This module contains:
//! - The bounded sample queue between the sampling loop and its consumer
//! - A single-slot wake signal used by idle loops
//! - Component state enums and the cell that guards them
//! - The control block driving four-phase pipeline loops

pub mod phase;
pub mod queue;
pub mod signal;
pub mod state;

pub use phase::PhaseControl;
pub use queue::{sample_queue, QueueError, SampleConsumer, SampleProducer};
pub use signal::Signal;
pub use state::{PhaseState, SourceState, StateCell};
