//! Raw sample forwarder for dataset collection.
//!
//! Consumes the sample queue instead of the step counter and writes every
//! sample unmodified to a network sink as one `timestamp,x,y,z,stepEdge` line.
//! Delivery is best effort: failed writes are logged and the record dropped.

use super::sink::{NetworkSink, SinkConfig};
use crate::error::{spawn_named, SpawnError};
use crate::pipeline::Pipeline;
use crate::sensor::types::Sample;
use crate::stats::SharedPipelineStats;
use crate::sync::{PhaseControl, PhaseState, QueueError, SampleConsumer};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Handle to the forwarding thread.
pub struct RawForwarder {
    control: Arc<PhaseControl>,
    thread_handle: Option<JoinHandle<()>>,
}

impl RawForwarder {
    /// Spawn the forwarding thread in the idle state.
    pub fn spawn<S>(
        consumer: SampleConsumer,
        sink: S,
        target: SinkConfig,
        pop_timeout: Duration,
        stats: SharedPipelineStats,
    ) -> Result<Self, SpawnError>
    where
        S: NetworkSink + Send + 'static,
    {
        let control = Arc::new(PhaseControl::new());

        let forward_loop = ForwardLoop {
            control: control.clone(),
            consumer,
            sink,
            target,
            pop_timeout,
            stats,
            connected: false,
        };
        let handle = spawn_named("forwarder", move || forward_loop.run())?;

        Ok(Self {
            control,
            thread_handle: Some(handle),
        })
    }
}

impl Pipeline for RawForwarder {
    fn name(&self) -> &'static str {
        "raw forwarder"
    }

    fn start(&self) {
        self.control.request_begin();
    }

    fn stop(&self) {
        self.control.request_finish();
    }

    fn state(&self) -> PhaseState {
        self.control.state()
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        self.control.wait_idle(timeout)
    }
}

impl Drop for RawForwarder {
    fn drop(&mut self) {
        self.control.shut_down();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

struct ForwardLoop<S> {
    control: Arc<PhaseControl>,
    consumer: SampleConsumer,
    sink: S,
    target: SinkConfig,
    pop_timeout: Duration,
    stats: SharedPipelineStats,
    connected: bool,
}

impl<S: NetworkSink> ForwardLoop<S> {
    fn run(mut self) {
        while !self.control.is_shut_down() {
            match self.control.state() {
                PhaseState::Begin => self.begin(),
                PhaseState::Running => match self.consumer.pop(self.pop_timeout) {
                    Ok(sample) => self.forward(&sample),
                    Err(QueueError::Disconnected) => {
                        tracing::error!("Forwarder: sample queue disconnected");
                        self.disconnect();
                        self.control.enter_idle(PhaseState::Running);
                    }
                    Err(e) => {
                        self.stats.record_pop_timeout();
                        tracing::warn!("Forwarder: failed to take sample: {e}");
                    }
                },
                PhaseState::Finish => self.finish(),
                PhaseState::Idle => self.control.park(),
            }
        }
        self.sink.stop();
    }

    fn begin(&mut self) {
        match self.sink.connect(&self.target.host, self.target.port) {
            Ok(()) => {
                self.connected = true;
                if self.control.enter_running() {
                    tracing::info!("Forwarder: connected to {}", self.target);
                } else {
                    // Stopped while connecting; Finish disconnects.
                    tracing::debug!("Forwarder: connected to {} after stop", self.target);
                }
            }
            Err(e) => {
                tracing::error!("Forwarder: failed to connect to {}: {e}", self.target);
                // Never flush into a sink that is not connected.
                self.control.abort_to_idle();
            }
        }
    }

    fn forward(&mut self, sample: &Sample) {
        let record = sample.to_record();
        match self.sink.write(record.as_bytes()) {
            Ok(_) => self.stats.record_forwarded(),
            Err(e) => {
                self.stats.record_write_failure();
                tracing::warn!("Forwarder: failed to send data: {e}");
            }
        }
    }

    fn finish(&mut self) {
        if !self.connected {
            // Stopped before the connection was attempted.
            self.control.enter_idle(PhaseState::Finish);
            return;
        }

        let mut drained = 0usize;
        while let Ok(sample) = self.consumer.try_pop() {
            self.forward(&sample);
            drained += 1;
        }
        self.disconnect();
        if self.control.enter_idle(PhaseState::Finish) {
            tracing::info!(
                "Forwarder: disconnected from {} ({drained} samples flushed)",
                self.target
            );
        }
    }

    fn disconnect(&mut self) {
        self.sink.stop();
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::create_shared_stats;
    use crate::sync::sample_queue;
    use std::io;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct MemorySink {
        written: Arc<Mutex<String>>,
        stops: Arc<Mutex<u32>>,
    }

    impl NetworkSink for MemorySink {
        fn connect(&mut self, _host: &str, _port: u16) -> io::Result<()> {
            Ok(())
        }

        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.written
                .lock()
                .unwrap()
                .push_str(std::str::from_utf8(bytes).unwrap());
            Ok(bytes.len())
        }

        fn stop(&mut self) {
            *self.stops.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_forwards_records_in_order() {
        let (producer, consumer) = sample_queue(16);
        let sink = MemorySink::default();
        let written = sink.written.clone();
        let stops = sink.stops.clone();
        let stats = create_shared_stats();

        let forwarder = RawForwarder::spawn(
            consumer,
            sink,
            SinkConfig::new("localhost", 1),
            Duration::from_millis(20),
            stats.clone(),
        )
        .unwrap();

        forwarder.start();
        while forwarder.state() != PhaseState::Running {
            std::thread::sleep(Duration::from_millis(1));
        }
        producer
            .push(Sample::new(10, [1, 2, 3], false), Duration::from_millis(5))
            .unwrap();
        producer
            .push(Sample::new(20, [-4, 5, -6], true), Duration::from_millis(5))
            .unwrap();
        forwarder.stop();
        assert!(forwarder.wait_idle(Duration::from_secs(2)));

        assert_eq!(written.lock().unwrap().as_str(), "10,1,2,3,0\n20,-4,5,-6,1\n");
        assert_eq!(stats.snapshot().records_forwarded, 2);
        assert!(*stops.lock().unwrap() >= 1);
    }
}
