//! Step Counter Agent - real-time accelerometer step counting.
//!
//! This library samples a 3-axis accelerometer at a fixed rate, assembles the
//! samples into fixed-size windows, derives six statistical features per
//! window and feeds them to a step predictor. A collection mode instead
//! streams the raw samples to a network sink for building datasets.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Step Counter Agent                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌─────────┐   ┌─────────┐ ready  ┌───────────┐ │
//! │  │   Sample   │──▶│ Bounded │──▶│  Drain  │───────▶│ Predictor │ │
//! │  │   Source   │   │  Queue  │   │  loop   │◀───────│   loop    │ │
//! │  └────────────┘   └─────────┘   └─────────┘consumed└───────────┘ │
//! │        ▲               │                                         │
//! │        │               └──────▶ Raw Forwarder ──▶ TCP sink       │
//! │        │                        (collection mode)                │
//! │  ┌─────┴──────────────┐                                          │
//! │  │ Session Controller │ start()/stop() on source + pipeline      │
//! │  └────────────────────┘                                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use step_counter_agent::{
//!     config::Config,
//!     core::{LinearModel, StepCounter, StepCounterConfig},
//!     pipeline::Pipeline,
//!     sensor::{SampleSource, SamplerConfig, SimulatedAccelerometer},
//!     stats::create_shared_stats,
//!     sync::sample_queue,
//! };
//!
//! let config = Config::default();
//! let stats = create_shared_stats();
//! let (producer, consumer) = sample_queue(100);
//! let (fatal_tx, _fatal_rx) = crossbeam_channel::unbounded();
//!
//! let source = SampleSource::spawn(
//!     SimulatedAccelerometer::new(100, 110.0),
//!     producer,
//!     None,
//!     SamplerConfig {
//!         sample_period: config.sample_period(),
//!         push_timeout: config.queue_timeout,
//!     },
//!     fatal_tx,
//!     stats.clone(),
//! )
//! .expect("Failed to start sampler");
//!
//! let counter = StepCounter::spawn(
//!     consumer,
//!     LinearModel::default(),
//!     StepCounterConfig { window_len: 100, pop_timeout: Duration::from_millis(500) },
//!     stats,
//! )
//! .expect("Failed to start step counter");
//!
//! source.start();
//! counter.start();
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod forward;
pub mod pipeline;
pub mod sensor;
pub mod session;
pub mod stats;
pub mod sync;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, PipelineMode};
pub use core::{extract, FeatureVector, LinearModel, StepCounter, StepPredictor};
pub use error::{FatalError, SpawnError};
pub use forward::{NetworkSink, RawForwarder, SinkConfig, TcpSink};
pub use pipeline::Pipeline;
pub use sensor::{Accelerometer, Sample, SampleSource};
pub use session::{SessionController, SessionReport, SessionTrigger};
pub use stats::{PipelineStats, SharedPipelineStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
