//! The sampling loop.
//!
//! While running, reads the accelerometer once per sample period, stamps the
//! reading, attaches a latched step edge if edge detection is enabled and
//! pushes the sample onto the queue. While idle, the thread parks on a wake
//! signal. A push that cannot complete within its timeout is fatal: the loop
//! reports it to the supervisor and parks rather than drop samples silently.

use super::edge::EdgeDetector;
use super::types::Sample;
use super::Accelerometer;
use crate::error::{spawn_named, FatalError, SpawnError};
use crate::stats::SharedPipelineStats;
use crate::sync::{SampleProducer, Signal, SourceState, StateCell};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Timing parameters of the sampling loop.
#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    /// Time between consecutive readings
    pub sample_period: Duration,
    /// Longest wait for room in the queue
    pub push_timeout: Duration,
}

struct SourceShared {
    state: StateCell<SourceState>,
    wake: Signal,
    shutdown: AtomicBool,
}

/// Handle to the sampling thread.
pub struct SampleSource {
    shared: Arc<SourceShared>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SampleSource {
    /// Spawn the sampling thread in the idle state.
    ///
    /// `edge` enables step-edge tagging; `None` leaves every sample untagged.
    pub fn spawn<A>(
        sensor: A,
        producer: SampleProducer,
        edge: Option<EdgeDetector>,
        config: SamplerConfig,
        fatal: Sender<FatalError>,
        stats: SharedPipelineStats,
    ) -> Result<Self, SpawnError>
    where
        A: Accelerometer + Send + 'static,
    {
        let shared = Arc::new(SourceShared {
            state: StateCell::new(SourceState::Idle),
            wake: Signal::new(),
            shutdown: AtomicBool::new(false),
        });

        let loop_shared = shared.clone();
        let handle = spawn_named("sampler", move || {
            let mut sampler = Sampler {
                shared: loop_shared,
                sensor,
                producer,
                edge,
                config,
                fatal,
                stats,
                epoch: Instant::now(),
            };
            sampler.run();
        })?;

        Ok(Self {
            shared,
            thread_handle: Some(handle),
        })
    }

    /// Begin sampling.
    pub fn start(&self) {
        self.shared.state.set(SourceState::Running);
        self.shared.wake.notify();
        tracing::debug!("Sampler: started");
    }

    /// Stop sampling. Takes effect at the end of the current sample period.
    pub fn stop(&self) {
        self.shared.state.set(SourceState::Idle);
        tracing::debug!("Sampler: stopped");
    }

    pub fn state(&self) -> SourceState {
        self.shared.state.get()
    }
}

impl Drop for SampleSource {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.wake.notify();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

struct Sampler<A> {
    shared: Arc<SourceShared>,
    sensor: A,
    producer: SampleProducer,
    edge: Option<EdgeDetector>,
    config: SamplerConfig,
    fatal: Sender<FatalError>,
    stats: SharedPipelineStats,
    epoch: Instant,
}

impl<A: Accelerometer> Sampler<A> {
    fn run(&mut self) {
        while !self.shared.shutdown.load(Ordering::SeqCst) {
            match self.shared.state.get() {
                SourceState::Running => {
                    let tick_start = Instant::now();

                    if let Err(fatal) = self.sample_once() {
                        tracing::error!("Sampler: {fatal}");
                        self.shared.state.set(SourceState::Idle);
                        let _ = self.fatal.send(fatal);
                        continue;
                    }

                    let elapsed = tick_start.elapsed();
                    if elapsed < self.config.sample_period {
                        thread::sleep(self.config.sample_period - elapsed);
                    }
                }
                SourceState::Idle => {
                    self.shared.wake.wait();
                }
            }
        }
    }

    fn sample_once(&mut self) -> Result<(), FatalError> {
        let step_edge = self.edge.as_ref().map(EdgeDetector::take).unwrap_or(false);
        let timestamp = self.epoch.elapsed().as_millis() as u64;
        let acceleration = self.sensor.read_acceleration();

        self.producer
            .push(
                Sample::new(timestamp, acceleration, step_edge),
                self.config.push_timeout,
            )
            .map_err(FatalError::SamplePush)?;

        self.stats.record_sample();
        Ok(())
    }
}
