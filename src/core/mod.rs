//! Window assembly, feature extraction and step prediction.
//!
//! This module contains:
//! - The reusable fixed-size window buffer
//! - Statistical feature extraction from a window
//! - The step predictor interface and built-in linear model
//! - The step counter pipeline tying them to the sample queue

pub mod features;
pub mod predictor;
pub mod step_counter;
pub mod windowing;

pub use features::{
    extract, extract_windows, FeatureError, FeatureVector, FEATURE_NAMES, NUM_FEATURES,
};
pub use predictor::{LinearModel, StepPredictor};
pub use step_counter::{StepCounter, StepCounterConfig};
pub use windowing::WindowBuffer;
