//! Statistical features of one sample window.
//!
//! Six fixed-width integer features are computed per window. Their order is
//! the input layout the step predictor was trained on and must not change:
//!
//! | index | feature                                   |
//! |-------|-------------------------------------------|
//! | 0     | dispersion of Z around its mean            |
//! | 1     | mean absolute deviation of Z               |
//! | 2     | minimum of Y                               |
//! | 3     | max - min of X                             |
//! | 4     | max - min of Y                             |
//! | 5     | max - min of Z                             |
//!
//! Feature 0 is the squared deviation sum divided by `N - 1`, without a
//! square root. Sums are accumulated in 64 bits and every result is truncated
//! to `i16`, wrapping like a narrowing cast.

use crate::sensor::types::{Axis, Sample};
use serde::{Deserialize, Serialize};

/// Number of features per window.
pub const NUM_FEATURES: usize = 6;

/// Feature names in predictor input order.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "std_z",
    "mean_abs_diff_z",
    "min_y",
    "max_min_diff_x",
    "max_min_diff_y",
    "max_min_diff_z",
];

/// Feature vector in predictor input order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureVector(pub [i16; NUM_FEATURES]);

impl FeatureVector {
    pub fn as_array(&self) -> &[i16; NUM_FEATURES] {
        &self.0
    }

    pub fn std_z(&self) -> i16 {
        self.0[0]
    }

    pub fn mean_abs_diff_z(&self) -> i16 {
        self.0[1]
    }

    pub fn min_y(&self) -> i16 {
        self.0[2]
    }

    /// Range (max - min) of one axis.
    pub fn range(&self, axis: Axis) -> i16 {
        self.0[3 + axis as usize]
    }

    /// Comma-separated values, no trailing newline.
    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl std::fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a} {b} {c} {d} {e} {g}")
    }
}

/// Errors from feature extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureError {
    /// Dispersion needs at least two samples
    WindowTooShort(usize),
}

impl std::fmt::Display for FeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureError::WindowTooShort(n) => {
                write!(f, "Window of {n} samples is too short, need at least 2")
            }
        }
    }
}

impl std::error::Error for FeatureError {}

/// Compute the feature vector of a window.
pub fn extract(window: &[Sample]) -> Result<FeatureVector, FeatureError> {
    if window.len() < 2 {
        return Err(FeatureError::WindowTooShort(window.len()));
    }

    let mean_z = mean(window, Axis::Z);

    Ok(FeatureVector([
        dispersion(window, Axis::Z, mean_z),
        mean_abs_diff(window, Axis::Z, mean_z),
        min(window, Axis::Y),
        max_min_diff(window, Axis::X),
        max_min_diff(window, Axis::Y),
        max_min_diff(window, Axis::Z),
    ]))
}

/// Compute one feature vector per complete, non-overlapping window of
/// `window_len` samples. A trailing partial window is ignored.
pub fn extract_windows(
    samples: &[Sample],
    window_len: usize,
) -> Result<Vec<FeatureVector>, FeatureError> {
    if window_len < 2 {
        return Err(FeatureError::WindowTooShort(window_len));
    }
    samples.chunks_exact(window_len).map(extract).collect()
}

fn mean(window: &[Sample], axis: Axis) -> i16 {
    let sum: i64 = window.iter().map(|s| i64::from(s.axis(axis))).sum();
    (sum / window.len() as i64) as i16
}

fn dispersion(window: &[Sample], axis: Axis, mean: i16) -> i16 {
    let sum: i64 = window
        .iter()
        .map(|s| {
            let d = i64::from(s.axis(axis)) - i64::from(mean);
            d * d
        })
        .sum();
    (sum / (window.len() as i64 - 1)) as i16
}

fn mean_abs_diff(window: &[Sample], axis: Axis, mean: i16) -> i16 {
    let sum: i64 = window
        .iter()
        .map(|s| (i64::from(s.axis(axis)) - i64::from(mean)).abs())
        .sum();
    (sum / window.len() as i64) as i16
}

fn min(window: &[Sample], axis: Axis) -> i16 {
    window.iter().map(|s| s.axis(axis)).min().unwrap_or(0)
}

fn max(window: &[Sample], axis: Axis) -> i16 {
    window.iter().map(|s| s.axis(axis)).max().unwrap_or(0)
}

fn max_min_diff(window: &[Sample], axis: Axis) -> i16 {
    max(window, axis).wrapping_sub(min(window, axis))
}
