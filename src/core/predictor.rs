//! Step predictor interface and the built-in linear model.

use super::features::{FeatureVector, NUM_FEATURES};
use serde::{Deserialize, Serialize};

/// Predicts the number of steps in one window from its features.
///
/// Called only from the predictor thread, once per counted window.
pub trait StepPredictor {
    fn predict(&mut self, features: &FeatureVector) -> i32;
}

impl<P: StepPredictor + ?Sized> StepPredictor for Box<P> {
    fn predict(&mut self, features: &FeatureVector) -> i32 {
        (**self).predict(features)
    }
}

/// Linear regression over the six window features.
///
/// `steps = round(intercept + Σ weights[i] * features[i])`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: [f64; NUM_FEATURES],
    pub intercept: f64,
}

impl LinearModel {
    pub fn new(weights: [f64; NUM_FEATURES], intercept: f64) -> Self {
        Self { weights, intercept }
    }

    fn evaluate(&self, features: &FeatureVector) -> f64 {
        self.weights
            .iter()
            .zip(features.as_array())
            .fold(self.intercept, |acc, (w, &f)| acc + w * f64::from(f))
    }
}

impl Default for LinearModel {
    /// Coarse coefficients for 1 s windows at 256 LSB/g: driven by the
    /// vertical mean deviation and range only.
    fn default() -> Self {
        Self {
            weights: [0.0, 0.02, 0.0, 0.0, 0.0, 0.005],
            intercept: 0.0,
        }
    }
}

impl StepPredictor for LinearModel {
    fn predict(&mut self, features: &FeatureVector) -> i32 {
        let value = self.evaluate(features).round();
        if value.is_finite() {
            value.clamp(i32::MIN as f64, i32::MAX as f64) as i32
        } else {
            0
        }
    }
}
