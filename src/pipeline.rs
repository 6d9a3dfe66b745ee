//! The consumer side of the sample queue, as seen by the session controller.

use crate::sync::PhaseState;
use std::time::Duration;

/// A queue consumer driven through `Idle -> Begin -> Running -> Finish -> Idle`.
///
/// Exactly one pipeline consumes the queue: the step counter or the raw
/// forwarder.
pub trait Pipeline: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Request `Begin`.
    fn start(&self);

    /// Request `Finish`. Queued samples are drained before the pipeline
    /// returns to `Idle`.
    fn stop(&self);

    fn state(&self) -> PhaseState;

    /// Block until the pipeline is `Idle` or `timeout` elapses.
    fn wait_idle(&self, timeout: Duration) -> bool;

    /// Process-wide step count, for pipelines that predict steps.
    fn step_count(&self) -> Option<u64> {
        None
    }
}

impl<P: Pipeline + ?Sized> Pipeline for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn start(&self) {
        (**self).start()
    }

    fn stop(&self) {
        (**self).stop()
    }

    fn state(&self) -> PhaseState {
        (**self).state()
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        (**self).wait_idle(timeout)
    }

    fn step_count(&self) -> Option<u64> {
        (**self).step_count()
    }
}
