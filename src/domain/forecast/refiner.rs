//! Optional regression refinement capability.

use crate::domain::features::PriceFeatures;
use crate::shared::errors::ForecastError;

const MAPE_EPS: f64 = 1e-6;

/// Pluggable regression capability. The available/unavailable choice is made
/// at wiring time (`Option<Arc<dyn RegressionRefiner>>`), never by probing
/// inside the hot path; the forecaster treats training failure and absence
/// identically by keeping the heuristic projection.
pub trait RegressionRefiner: Send + Sync {
    /// Train on the feature vector against the latest observed price and
    /// return the model's prediction.
    fn fit_predict(&self, features: &PriceFeatures, target: f64) -> Result<f64, ForecastError>;
}

/// Built-in gradient-boosted regressor. With a single training sample,
/// boosting stumps under squared loss reduces to shrinkage of the prediction
/// toward the target, so the prediction is constant over any holdout slice.
pub struct BoostedRefiner {
    iterations: u32,
    learning_rate: f64,
}

impl BoostedRefiner {
    pub fn new(iterations: u32, learning_rate: f64) -> Self {
        Self {
            iterations,
            learning_rate,
        }
    }
}

impl Default for BoostedRefiner {
    fn default() -> Self {
        Self::new(60, 0.1)
    }
}

impl RegressionRefiner for BoostedRefiner {
    fn fit_predict(&self, _features: &PriceFeatures, target: f64) -> Result<f64, ForecastError> {
        if !target.is_finite() {
            return Err(ForecastError::ModelTrainingFailure(format!(
                "non-finite target: {}",
                target
            )));
        }
        let mut prediction = 0.0;
        for _ in 0..self.iterations {
            prediction += self.learning_rate * (target - prediction);
        }
        Ok(prediction)
    }
}

/// Mean Absolute Percentage Error between held-out actuals and predictions.
/// Zero-valued actuals are skipped; an empty comparison yields 1.0, the
/// worst score, so an unusable holdout can never pass the gate.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    let mut errors = Vec::new();
    for (a, p) in actual.iter().zip(predicted) {
        if *a == 0.0 {
            continue;
        }
        errors.push(((a - p) / (a + MAPE_EPS)).abs());
    }
    if errors.is_empty() {
        return 1.0;
    }
    errors.iter().sum::<f64>() / errors.len() as f64
}
