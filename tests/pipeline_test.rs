//! Integration tests for the step counter and raw forwarder pipelines

use std::io::{self, Read};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use step_counter_agent::config::Config;
use step_counter_agent::core::{FeatureVector, StepCounter, StepCounterConfig, StepPredictor};
use step_counter_agent::forward::{NetworkSink, RawForwarder, SinkConfig, TcpSink};
use step_counter_agent::pipeline::Pipeline;
use step_counter_agent::sensor::{Axis, Sample};
use step_counter_agent::stats::create_shared_stats;
use step_counter_agent::sync::{sample_queue, PhaseState, SampleProducer};

const PUSH_TIMEOUT: Duration = Duration::from_secs(1);
const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Predictor that records every feature vector and returns a fixed count.
#[derive(Clone, Default)]
struct RecordingPredictor {
    calls: Arc<Mutex<Vec<FeatureVector>>>,
    steps: i32,
}

impl RecordingPredictor {
    fn returning(steps: i32) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<FeatureVector> {
        self.calls.lock().unwrap().clone()
    }
}

impl StepPredictor for RecordingPredictor {
    fn predict(&mut self, features: &FeatureVector) -> i32 {
        self.calls.lock().unwrap().push(*features);
        self.steps
    }
}

fn counter_config(window_len: usize) -> StepCounterConfig {
    StepCounterConfig {
        window_len,
        pop_timeout: Duration::from_millis(50),
    }
}

fn wait_for_state(pipeline: &dyn Pipeline, state: PhaseState) {
    let deadline = Instant::now() + IDLE_TIMEOUT;
    while pipeline.state() != state {
        assert!(Instant::now() < deadline, "pipeline never reached {state}");
        thread::sleep(Duration::from_millis(1));
    }
}

fn push_all(producer: &SampleProducer, samples: impl IntoIterator<Item = Sample>) {
    for sample in samples {
        producer.push(sample, PUSH_TIMEOUT).unwrap();
    }
}

#[test]
fn test_three_constant_windows_predict_twice() {
    let (producer, consumer) = sample_queue(400);
    let predictor = RecordingPredictor::returning(1);
    let stats = create_shared_stats();
    let counter =
        StepCounter::spawn(consumer, predictor.clone(), counter_config(100), stats.clone())
            .unwrap();

    counter.start();
    push_all(&producer, (0..300).map(|ts| Sample::new(ts, [0, 0, 0], false)));
    counter.stop();
    assert!(counter.wait_idle(IDLE_TIMEOUT));

    // First window is warm-up.
    assert_eq!(predictor.calls(), vec![FeatureVector([0; 6]); 2]);
    assert_eq!(counter.steps(), 2);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.windows_completed, 3);
    assert_eq!(snapshot.windows_discarded, 1);
    assert_eq!(snapshot.predictions, 2);
}

#[test]
fn test_handoff_every_window_len_samples() {
    let config = Config {
        sample_rate_hz: 100,
        window_duration_ms: 1000,
        ..Config::default()
    };
    let window_len = config.window_len();
    assert_eq!(window_len, 100);

    let (producer, consumer) = sample_queue(window_len * 4);
    let stats = create_shared_stats();
    let counter = StepCounter::spawn(
        consumer,
        RecordingPredictor::returning(1),
        counter_config(window_len),
        stats.clone(),
    )
    .unwrap();

    counter.start();
    push_all(&producer, (0..250).map(|ts| Sample::new(ts, [1, 2, 3], false)));
    counter.stop();
    assert!(counter.wait_idle(IDLE_TIMEOUT));
    assert_eq!(stats.snapshot().windows_completed, 2);

    // The 50 samples left in the buffer complete the next session's first
    // window, which is discarded as warm-up.
    counter.start();
    push_all(&producer, (250..300).map(|ts| Sample::new(ts, [1, 2, 3], false)));
    counter.stop();
    assert!(counter.wait_idle(IDLE_TIMEOUT));

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.windows_completed, 3);
    assert_eq!(snapshot.windows_discarded, 2);
    assert_eq!(snapshot.predictions, 1);
    assert_eq!(counter.steps(), 1);
}

#[test]
fn test_warm_up_window_never_counted() {
    let (producer, consumer) = sample_queue(64);
    let counter = StepCounter::spawn(
        consumer,
        RecordingPredictor::returning(5),
        counter_config(4),
        create_shared_stats(),
    )
    .unwrap();

    counter.start();
    // A wild first window followed by two quiet ones.
    push_all(
        &producer,
        [[i16::MAX, i16::MIN, i16::MAX], [i16::MIN, i16::MAX, i16::MIN]]
            .into_iter()
            .cycle()
            .take(4)
            .chain(std::iter::repeat([0, 0, 256]).take(8))
            .enumerate()
            .map(|(ts, a)| Sample::new(ts as u64, a, false)),
    );
    counter.stop();
    assert!(counter.wait_idle(IDLE_TIMEOUT));

    assert_eq!(counter.steps(), 10);
}

/// Predictor that checks the drain loop is parked while a window is read.
struct InFlightWatcher {
    queue: Arc<SampleProducer>,
    observations: Arc<Mutex<Vec<(usize, usize, FeatureVector)>>>,
}

impl StepPredictor for InFlightWatcher {
    fn predict(&mut self, features: &FeatureVector) -> i32 {
        let before = self.queue.len();
        thread::sleep(Duration::from_millis(20));
        let after = self.queue.len();
        self.observations
            .lock()
            .unwrap()
            .push((before, after, *features));
        1
    }
}

#[test]
fn test_at_most_one_window_in_flight() {
    const WINDOW: usize = 10;
    let (producer, consumer) = sample_queue(WINDOW * 5);
    let producer = Arc::new(producer);
    let observations = Arc::new(Mutex::new(Vec::new()));

    // Y holds the window index, X the position within the window.
    push_all(
        &producer,
        (0..WINDOW * 5).map(|i| {
            let a = [(i % WINDOW) as i16, (i / WINDOW) as i16, 0];
            Sample::new(i as u64, a, false)
        }),
    );

    let watcher = InFlightWatcher {
        queue: producer.clone(),
        observations: observations.clone(),
    };
    let counter =
        StepCounter::spawn(consumer, watcher, counter_config(WINDOW), create_shared_stats()).unwrap();

    counter.start();
    counter.stop();
    assert!(counter.wait_idle(IDLE_TIMEOUT));

    let observations = observations.lock().unwrap();
    assert_eq!(observations.len(), 4);
    for (index, (before, after, features)) in observations.iter().enumerate() {
        // Nothing was popped while the predictor held the window.
        assert_eq!(before, after, "window {index} was drained under the predictor");
        // Every predicted window is one whole block, in order.
        assert_eq!(features.range(Axis::Y), 0);
        assert_eq!(features.min_y(), index as i16 + 1);
        assert_eq!(features.range(Axis::X), WINDOW as i16 - 1);
    }
    assert_eq!(counter.steps(), 4);
}

#[test]
fn test_queue_preserves_push_order() {
    let (producer, consumer) = sample_queue(8);

    let writer = thread::spawn(move || {
        for ts in 0..1000u64 {
            producer
                .push(Sample::new(ts, [ts as i16, 0, 0], false), PUSH_TIMEOUT)
                .unwrap();
        }
    });

    for expected in 0..1000u64 {
        let sample = consumer.pop(PUSH_TIMEOUT).unwrap();
        assert_eq!(sample.timestamp, expected);
    }
    writer.join().unwrap();
}

#[test]
fn test_begin_then_finish_on_empty_queue() {
    let (_producer, consumer) = sample_queue(16);
    let counter = StepCounter::spawn(
        consumer,
        RecordingPredictor::returning(1),
        counter_config(4),
        create_shared_stats(),
    )
    .unwrap();

    for _ in 0..3 {
        counter.start();
        counter.stop();
        assert!(counter.wait_idle(Duration::from_secs(1)));
        assert_eq!(counter.state(), PhaseState::Idle);
    }
    assert_eq!(counter.steps(), 0);
}

/// Sink that refuses every connection.
#[derive(Clone, Default)]
struct RefusingSink {
    writes: Arc<Mutex<usize>>,
}

impl NetworkSink for RefusingSink {
    fn connect(&mut self, _host: &str, _port: u16) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        *self.writes.lock().unwrap() += 1;
        Ok(bytes.len())
    }

    fn stop(&mut self) {}
}

#[test]
fn test_forwarder_connect_failure_returns_to_idle() {
    let (producer, consumer) = sample_queue(16);
    push_all(&producer, (0..5).map(|ts| Sample::new(ts, [1, 1, 1], false)));

    let sink = RefusingSink::default();
    let writes = sink.writes.clone();
    let forwarder = RawForwarder::spawn(
        consumer,
        sink,
        SinkConfig::new("127.0.0.1", 9),
        Duration::from_millis(50),
        create_shared_stats(),
    )
    .unwrap();

    forwarder.start();
    assert!(forwarder.wait_idle(IDLE_TIMEOUT));
    assert_eq!(forwarder.state(), PhaseState::Idle);

    // Nothing consumed, nothing written.
    assert_eq!(producer.len(), 5);
    assert_eq!(*writes.lock().unwrap(), 0);
}

/// Sink whose connection attempt takes a while and then fails.
#[derive(Clone, Default)]
struct SlowRefusingSink {
    writes: Arc<Mutex<usize>>,
}

impl NetworkSink for SlowRefusingSink {
    fn connect(&mut self, _host: &str, _port: u16) -> io::Result<()> {
        thread::sleep(Duration::from_millis(200));
        Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        *self.writes.lock().unwrap() += 1;
        Ok(bytes.len())
    }

    fn stop(&mut self) {}
}

#[test]
fn test_stop_during_failed_connect_keeps_queue() {
    let (producer, consumer) = sample_queue(16);
    push_all(&producer, (0..5).map(|ts| Sample::new(ts, [1, 1, 1], false)));

    let sink = SlowRefusingSink::default();
    let writes = sink.writes.clone();
    let stats = create_shared_stats();
    let forwarder = RawForwarder::spawn(
        consumer,
        sink,
        SinkConfig::new("127.0.0.1", 9),
        Duration::from_millis(50),
        stats.clone(),
    )
    .unwrap();

    forwarder.start();
    thread::sleep(Duration::from_millis(50));
    forwarder.stop();
    assert_eq!(forwarder.state(), PhaseState::Finish);
    assert!(forwarder.wait_idle(IDLE_TIMEOUT));

    assert_eq!(producer.len(), 5);
    assert_eq!(*writes.lock().unwrap(), 0);
    assert_eq!(stats.snapshot().write_failures, 0);
}

/// Sink that fails every write after connecting.
struct BrokenPipeSink;

impl NetworkSink for BrokenPipeSink {
    fn connect(&mut self, _host: &str, _port: u16) -> io::Result<()> {
        Ok(())
    }

    fn write(&mut self, _bytes: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
    }

    fn stop(&mut self) {}
}

#[test]
fn test_forwarder_write_failures_are_not_fatal() {
    let (producer, consumer) = sample_queue(16);
    let stats = create_shared_stats();
    let forwarder = RawForwarder::spawn(
        consumer,
        BrokenPipeSink,
        SinkConfig::new("127.0.0.1", 9),
        Duration::from_millis(50),
        stats.clone(),
    )
    .unwrap();

    forwarder.start();
    wait_for_state(&forwarder, PhaseState::Running);
    push_all(&producer, (0..3).map(|ts| Sample::new(ts, [0, 0, 0], false)));
    forwarder.stop();
    assert!(forwarder.wait_idle(IDLE_TIMEOUT));

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.write_failures, 3);
    assert_eq!(snapshot.records_forwarded, 0);
    assert!(producer.is_empty());
}

#[test]
fn test_forwarder_streams_records_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut conn, _) = listener.accept().unwrap();
        let mut received = String::new();
        conn.read_to_string(&mut received).unwrap();
        received
    });

    let (producer, consumer) = sample_queue(16);
    let forwarder = RawForwarder::spawn(
        consumer,
        TcpSink::default(),
        SinkConfig::new("127.0.0.1", port),
        Duration::from_millis(50),
        create_shared_stats(),
    )
    .unwrap();

    forwarder.start();
    wait_for_state(&forwarder, PhaseState::Running);
    push_all(
        &producer,
        [
            Sample::new(100, [12, -7, 260], false),
            Sample::new(110, [15, -3, 251], true),
            Sample::new(120, [-1, 0, 249], false),
        ],
    );
    forwarder.stop();
    assert!(forwarder.wait_idle(IDLE_TIMEOUT));

    assert_eq!(
        server.join().unwrap(),
        "100,12,-7,260,0\n110,15,-3,251,1\n120,-1,0,249,0\n"
    );
}
