//! Sample types flowing through the pipeline.
//!
//! A [`Sample`] is produced once by the sampling loop and never modified
//! afterwards. It is owned by the queue while in transit and by the window
//! buffer once drained.

use serde::{Deserialize, Serialize};

/// Accelerometer axis, usable as an index into [`Sample::acceleration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// A single 3-axis accelerometer reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the sampling loop's epoch
    pub timestamp: u64,
    /// Raw X, Y, Z acceleration
    pub acceleration: [i16; 3],
    /// Whether a step edge was latched during this sampling period
    pub step_edge: bool,
}

impl Sample {
    pub fn new(timestamp: u64, acceleration: [i16; 3], step_edge: bool) -> Self {
        Self {
            timestamp,
            acceleration,
            step_edge,
        }
    }

    /// Value of one axis.
    #[inline]
    pub fn axis(&self, axis: Axis) -> i16 {
        self.acceleration[axis as usize]
    }

    /// Encode as a newline-terminated `timestamp,x,y,z,stepEdge` record.
    ///
    /// The step edge is written as `0` or `1`.
    pub fn to_record(&self) -> String {
        format!(
            "{},{},{},{},{}\n",
            self.timestamp,
            self.acceleration[0],
            self.acceleration[1],
            self.acceleration[2],
            u8::from(self.step_edge)
        )
    }

    /// Parse a `timestamp,x,y,z,stepEdge` record. Surrounding whitespace and a
    /// trailing newline are ignored.
    pub fn from_record(line: &str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
        if fields.len() != 5 {
            return Err(RecordError::FieldCount(fields.len()));
        }

        let timestamp = fields[0]
            .parse::<u64>()
            .map_err(|_| RecordError::InvalidField("timestamp", fields[0].to_string()))?;

        let mut acceleration = [0i16; 3];
        for (slot, (name, raw)) in acceleration
            .iter_mut()
            .zip([("x", fields[1]), ("y", fields[2]), ("z", fields[3])])
        {
            *slot = raw
                .parse::<i16>()
                .map_err(|_| RecordError::InvalidField(name, raw.to_string()))?;
        }

        let step_edge = match fields[4] {
            "0" | "false" => false,
            "1" | "true" => true,
            other => return Err(RecordError::InvalidField("step_edge", other.to_string())),
        };

        Ok(Self {
            timestamp,
            acceleration,
            step_edge,
        })
    }
}

/// Errors from parsing a delimited sample record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    FieldCount(usize),
    InvalidField(&'static str, String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::FieldCount(n) => write!(f, "Expected 5 fields, found {n}"),
            RecordError::InvalidField(name, value) => {
                write!(f, "Invalid value for {name}: '{value}'")
            }
        }
    }
}

impl std::error::Error for RecordError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_format() {
        let sample = Sample::new(1234, [-12, 0, 1023], true);
        assert_eq!(sample.to_record(), "1234,-12,0,1023,1\n");

        let sample = Sample::new(7, [1, 2, 3], false);
        assert_eq!(sample.to_record(), "7,1,2,3,0\n");
    }

    #[test]
    fn test_record_parsing() {
        let sample = Sample::from_record("1234,-12,0,1023,1\n").unwrap();
        assert_eq!(sample.timestamp, 1234);
        assert_eq!(sample.acceleration, [-12, 0, 1023]);
        assert!(sample.step_edge);
        assert_eq!(sample.axis(Axis::X), -12);
        assert_eq!(sample.axis(Axis::Z), 1023);
    }

    #[test]
    fn test_record_parsing_errors() {
        assert_eq!(
            Sample::from_record("1,2,3"),
            Err(RecordError::FieldCount(3))
        );
        assert!(matches!(
            Sample::from_record("1,2,40000,4,0"),
            Err(RecordError::InvalidField("y", _))
        ));
        assert!(matches!(
            Sample::from_record("1,2,3,4,maybe"),
            Err(RecordError::InvalidField("step_edge", _))
        ));
    }
}
