//! Sample source and its sensor collaborators.
//!
//! The sampling loop only needs one operation from hardware: read the current
//! 3-axis acceleration. Implementations provided here cover running without a
//! device (simulated waveform) and re-running recorded datasets (replay).

pub mod edge;
pub mod replay;
pub mod simulated;
pub mod source;
pub mod types;

pub use edge::EdgeDetector;
pub use replay::ReplayAccelerometer;
pub use simulated::SimulatedAccelerometer;
pub use source::{SampleSource, SamplerConfig};
pub use types::{Axis, Sample};

/// A 3-axis accelerometer.
///
/// Reads are synchronous and infallible once the device is initialized;
/// initialization failures are reported by the constructor.
pub trait Accelerometer {
    fn read_acceleration(&mut self) -> [i16; 3];
}

impl<A: Accelerometer + ?Sized> Accelerometer for Box<A> {
    fn read_acceleration(&mut self) -> [i16; 3] {
        (**self).read_acceleration()
    }
}

/// Sensor initialization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    Init(String),
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::Init(e) => write!(f, "Failed to initialize accelerometer: {e}"),
        }
    }
}

impl std::error::Error for SensorError {}
