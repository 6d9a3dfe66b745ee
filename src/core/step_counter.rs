//! Window assembly and step prediction.
//!
//! Two threads cooperate on one window buffer:
//!
//! - The **drain** thread pops samples from the queue and writes them into the
//!   buffer. When the write position wraps, it hands the buffer to the
//!   predictor and blocks until the buffer comes back.
//! - The **predictor** thread extracts features from each handed-over window,
//!   runs the predictor and adds the result to the step count, then returns
//!   the buffer.
//!
//! The buffer itself is moved through two capacity-1 channels ("window ready"
//! and "window consumed"), so at most one window is in flight and the drain
//! thread cannot touch a window the predictor is still reading.
//!
//! The first window completed after each `start()` is discarded: it may hold
//! samples queued before the session began.

use super::features::extract;
use super::predictor::StepPredictor;
use super::windowing::WindowBuffer;
use crate::error::{spawn_named, SpawnError};
use crate::pipeline::Pipeline;
use crate::sensor::types::Sample;
use crate::stats::SharedPipelineStats;
use crate::sync::{PhaseControl, PhaseState, QueueError, SampleConsumer};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Step counter parameters.
#[derive(Debug, Clone, Copy)]
pub struct StepCounterConfig {
    /// Samples per window
    pub window_len: usize,
    /// Longest wait for a sample while running
    pub pop_timeout: Duration,
}

struct CounterShared {
    control: PhaseControl,
    /// Bumped by every `start()`; windows are tagged with it
    session: AtomicU64,
    step_count: AtomicU64,
}

/// A completed window on its way to the predictor.
struct WindowHandoff {
    window: WindowBuffer,
    session: u64,
}

/// Handle to the drain and predictor threads.
pub struct StepCounter {
    shared: Arc<CounterShared>,
    drain_handle: Option<JoinHandle<()>>,
    predictor_handle: Option<JoinHandle<()>>,
}

impl StepCounter {
    /// Spawn both threads in the idle state.
    pub fn spawn<P>(
        consumer: SampleConsumer,
        predictor: P,
        config: StepCounterConfig,
        stats: SharedPipelineStats,
    ) -> Result<Self, SpawnError>
    where
        P: StepPredictor + Send + 'static,
    {
        let shared = Arc::new(CounterShared {
            control: PhaseControl::new(),
            session: AtomicU64::new(0),
            step_count: AtomicU64::new(0),
        });

        let (ready_tx, ready_rx) = bounded::<WindowHandoff>(1);
        let (consumed_tx, consumed_rx) = bounded::<WindowBuffer>(1);

        let predictor_loop = PredictorLoop {
            shared: shared.clone(),
            predictor,
            ready: ready_rx,
            consumed: consumed_tx,
            stats: stats.clone(),
            last_session: None,
        };
        let predictor_handle = spawn_named("predictor", move || predictor_loop.run())?;

        let drain_loop = DrainLoop {
            shared: shared.clone(),
            consumer,
            buffer: Some(WindowBuffer::new(config.window_len)),
            ready: ready_tx,
            consumed: consumed_rx,
            pop_timeout: config.pop_timeout,
            stats,
        };
        let drain_handle = match spawn_named("drain", move || drain_loop.run()) {
            Ok(handle) => handle,
            Err(e) => {
                // The predictor exits once its ready channel disconnects.
                let _ = predictor_handle.join();
                return Err(e);
            }
        };

        Ok(Self {
            shared,
            drain_handle: Some(drain_handle),
            predictor_handle: Some(predictor_handle),
        })
    }

    /// Steps counted since the process started.
    pub fn steps(&self) -> u64 {
        self.shared.step_count.load(Ordering::SeqCst)
    }
}

impl Pipeline for StepCounter {
    fn name(&self) -> &'static str {
        "step counter"
    }

    fn start(&self) {
        self.shared.session.fetch_add(1, Ordering::SeqCst);
        self.shared.control.request_begin();
    }

    fn stop(&self) {
        self.shared.control.request_finish();
    }

    fn state(&self) -> PhaseState {
        self.shared.control.state()
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        self.shared.control.wait_idle(timeout)
    }

    fn step_count(&self) -> Option<u64> {
        Some(self.steps())
    }
}

impl Drop for StepCounter {
    fn drop(&mut self) {
        self.shared.control.shut_down();
        if let Some(handle) = self.drain_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.predictor_handle.take() {
            let _ = handle.join();
        }
    }
}

struct DrainLoop {
    shared: Arc<CounterShared>,
    consumer: SampleConsumer,
    /// `None` only while the window is with the predictor
    buffer: Option<WindowBuffer>,
    ready: Sender<WindowHandoff>,
    consumed: Receiver<WindowBuffer>,
    pop_timeout: Duration,
    stats: SharedPipelineStats,
}

impl DrainLoop {
    fn run(mut self) {
        let shared = self.shared.clone();
        let control = &shared.control;

        while !control.is_shut_down() {
            match control.state() {
                PhaseState::Begin => {
                    if control.enter_running() {
                        tracing::info!("Step counter: started");
                    }
                }
                PhaseState::Running => match self.consumer.pop(self.pop_timeout) {
                    Ok(sample) => self.write(sample),
                    Err(QueueError::Disconnected) => {
                        tracing::error!("Step counter: sample queue disconnected");
                        control.enter_idle(PhaseState::Running);
                    }
                    Err(e) => {
                        self.stats.record_pop_timeout();
                        tracing::warn!("Step counter: failed to pipe data to buffer: {e}");
                    }
                },
                PhaseState::Finish => {
                    let mut drained = 0usize;
                    while let Ok(sample) = self.consumer.try_pop() {
                        self.write(sample);
                        drained += 1;
                    }
                    if control.enter_idle(PhaseState::Finish) {
                        tracing::info!("Step counter: stopped ({drained} samples flushed)");
                    }
                }
                PhaseState::Idle => control.park(),
            }
        }
    }

    fn write(&mut self, sample: Sample) {
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        if buffer.push(sample) {
            self.hand_off();
        }
    }

    /// Give the full window to the predictor and wait for it back.
    fn hand_off(&mut self) {
        let Some(window) = self.buffer.take() else {
            return;
        };
        self.stats.record_window_completed();

        let handoff = WindowHandoff {
            window,
            session: self.shared.session.load(Ordering::SeqCst),
        };
        if self.ready.send(handoff).is_err() {
            tracing::error!("Step counter: predictor thread is gone");
            return;
        }

        match self.consumed.recv() {
            Ok(window) => self.buffer = Some(window),
            Err(_) => tracing::error!("Step counter: predictor thread is gone"),
        }
    }
}

struct PredictorLoop<P> {
    shared: Arc<CounterShared>,
    predictor: P,
    ready: Receiver<WindowHandoff>,
    consumed: Sender<WindowBuffer>,
    stats: SharedPipelineStats,
    /// Session of the last window seen; a new session means warm-up
    last_session: Option<u64>,
}

impl<P: StepPredictor> PredictorLoop<P> {
    fn run(mut self) {
        while let Ok(WindowHandoff { window, session }) = self.ready.recv() {
            if self.last_session != Some(session) {
                self.last_session = Some(session);
                self.stats.record_window_discarded();
                tracing::debug!("Step counter: discarding warm-up window");
            } else {
                self.count(&window);
            }

            if self.consumed.send(window).is_err() {
                break;
            }
        }
    }

    fn count(&mut self, window: &WindowBuffer) {
        let features = match extract(window.as_slice()) {
            Ok(features) => features,
            Err(e) => {
                tracing::error!("Step counter: {e}");
                return;
            }
        };
        tracing::debug!("Features: {features}");

        let steps = self.predictor.predict(&features);
        self.stats.record_prediction();
        tracing::info!("Predicted steps: {steps}");

        // The count never decreases.
        let steps = u64::try_from(steps).unwrap_or(0);
        self.shared.step_count.fetch_add(steps, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::FeatureVector;
    use crate::stats::create_shared_stats;
    use crate::sync::sample_queue;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recording {
        calls: Arc<Mutex<Vec<FeatureVector>>>,
        steps: i32,
    }

    impl StepPredictor for Recording {
        fn predict(&mut self, features: &FeatureVector) -> i32 {
            self.calls.lock().unwrap().push(*features);
            self.steps
        }
    }

    fn config(window_len: usize) -> StepCounterConfig {
        StepCounterConfig {
            window_len,
            pop_timeout: Duration::from_millis(20),
        }
    }

    #[test]
    fn test_idle_counter_leaves_queue_alone() {
        let (producer, consumer) = sample_queue(16);
        let counter =
            StepCounter::spawn(consumer, Recording::default(), config(4), create_shared_stats())
                .unwrap();

        producer
            .push(Sample::default(), Duration::from_millis(5))
            .unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.state(), PhaseState::Idle);
        assert_eq!(producer.len(), 1);
    }

    #[test]
    fn test_negative_predictions_do_not_decrease_count() {
        let (producer, consumer) = sample_queue(64);
        let predictor = Recording {
            steps: -3,
            ..Recording::default()
        };
        let calls = predictor.calls.clone();
        let counter =
            StepCounter::spawn(consumer, predictor, config(4), create_shared_stats()).unwrap();

        counter.start();
        for ts in 0..12 {
            producer
                .push(Sample::new(ts, [0, 0, 0], false), Duration::from_millis(50))
                .unwrap();
        }
        counter.stop();
        assert!(counter.wait_idle(Duration::from_secs(2)));

        assert_eq!(calls.lock().unwrap().len(), 2);
        assert_eq!(counter.steps(), 0);
    }

    #[test]
    fn test_start_stop_with_empty_queue() {
        let (_producer, consumer) = sample_queue(16);
        let counter =
            StepCounter::spawn(consumer, Recording::default(), config(4), create_shared_stats())
                .unwrap();

        counter.start();
        counter.stop();
        assert!(counter.wait_idle(Duration::from_secs(1)));
        assert_eq!(counter.step_count(), Some(0));
    }
}
