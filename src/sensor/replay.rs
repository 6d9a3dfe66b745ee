//! Accelerometer that replays a recorded dataset.
//!
//! Reads files in the raw forwarder's record format (`timestamp,x,y,z,stepEdge`
//! per line). Header lines and blank lines are skipped. Playback loops back to
//! the start when the recording is exhausted.

use super::types::{RecordError, Sample};
use super::{Accelerometer, SensorError};
use std::path::Path;

/// Replays recorded acceleration values in order.
#[derive(Debug, Clone)]
pub struct ReplayAccelerometer {
    samples: Vec<Sample>,
    cursor: usize,
}

impl ReplayAccelerometer {
    /// Load a recording from disk.
    pub fn open(path: &Path) -> Result<Self, SensorError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SensorError::Init(format!("Failed to read {path:?}: {e}")))?;
        let samples = parse_recording(&content)
            .map_err(|e| SensorError::Init(format!("Failed to parse {path:?}: {e}")))?;
        Self::from_samples(samples)
    }

    /// Replay an in-memory recording.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self, SensorError> {
        if samples.is_empty() {
            return Err(SensorError::Init("Recording contains no samples".to_string()));
        }
        Ok(Self { samples, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Accelerometer for ReplayAccelerometer {
    fn read_acceleration(&mut self) -> [i16; 3] {
        let reading = self.samples[self.cursor].acceleration;
        self.cursor = (self.cursor + 1) % self.samples.len();
        reading
    }
}

/// Parse a whole recording, reporting the first bad line.
pub fn parse_recording(content: &str) -> Result<Vec<Sample>, ReplayError> {
    let mut samples = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_header(trimmed) {
            continue;
        }
        let sample = Sample::from_record(trimmed).map_err(|source| ReplayError {
            line: index + 1,
            source,
        })?;
        samples.push(sample);
    }

    Ok(samples)
}

fn is_header(line: &str) -> bool {
    line.starts_with('#')
        || line
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false)
}

/// A malformed line in a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayError {
    pub line: usize,
    pub source: RecordError,
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.source)
    }
}

impl std::error::Error for ReplayError {}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDING: &str = "timestamp,x,y,z,step\n\
                             10,1,2,3,0\n\
                             \n\
                             20,4,5,6,1\n";

    #[test]
    fn test_parse_skips_header_and_blanks() {
        let samples = parse_recording(RECORDING).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].acceleration, [4, 5, 6]);
        assert!(samples[1].step_edge);
    }

    #[test]
    fn test_parse_reports_line() {
        let err = parse_recording("10,1,2,3,0\n20,x\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_replay_loops() {
        let samples = parse_recording(RECORDING).unwrap();
        let mut sensor = ReplayAccelerometer::from_samples(samples).unwrap();
        assert_eq!(sensor.read_acceleration(), [1, 2, 3]);
        assert_eq!(sensor.read_acceleration(), [4, 5, 6]);
        assert_eq!(sensor.read_acceleration(), [1, 2, 3]);
    }

    #[test]
    fn test_empty_recording_rejected() {
        assert!(ReplayAccelerometer::from_samples(Vec::new()).is_err());
    }
}
