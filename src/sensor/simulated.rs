//! Synthetic accelerometer for running the agent without hardware.
//!
//! Produces a deterministic walking-like waveform: gravity on Z, a vertical
//! bounce at the step cadence and a slower lateral sway at half cadence.
//! Values are in raw sensor units (256 LSB/g).

use super::Accelerometer;
use std::f64::consts::TAU;

/// Raw units per g.
const ONE_G: f64 = 256.0;

/// Deterministic gait waveform generator.
#[derive(Debug, Clone)]
pub struct SimulatedAccelerometer {
    sample_rate_hz: u32,
    steps_per_minute: f64,
    tick: u64,
}

impl SimulatedAccelerometer {
    /// Create a generator sampled at `sample_rate_hz` walking at
    /// `steps_per_minute`. A cadence of zero yields a device at rest.
    pub fn new(sample_rate_hz: u32, steps_per_minute: f64) -> Self {
        Self {
            sample_rate_hz: sample_rate_hz.max(1),
            steps_per_minute: steps_per_minute.max(0.0),
            tick: 0,
        }
    }

    fn reading_at(&self, tick: u64) -> [i16; 3] {
        let step_hz = self.steps_per_minute / 60.0;
        if step_hz == 0.0 {
            return [0, 0, ONE_G as i16];
        }

        let t = tick as f64 / self.sample_rate_hz as f64;

        let bounce = (TAU * step_hz * t).sin();
        let sway = (TAU * step_hz * 0.5 * t).sin();
        // Heel strike shows up as a short forward jolt.
        let jolt = (TAU * step_hz * t).cos().max(0.0).powi(4);

        let x = 0.25 * ONE_G * jolt;
        let y = 0.15 * ONE_G * sway;
        let z = ONE_G + 0.4 * ONE_G * bounce;

        [x.round() as i16, y.round() as i16, z.round() as i16]
    }
}

impl Accelerometer for SimulatedAccelerometer {
    fn read_acceleration(&mut self) -> [i16; 3] {
        let reading = self.reading_at(self.tick);
        self.tick = self.tick.wrapping_add(1);
        reading
    }
}
