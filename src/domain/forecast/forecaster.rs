use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, warn};

use super::confidence;
use super::refiner::{mape, RegressionRefiner};
use crate::domain::features::{self, PriceFeatures};
use crate::domain::seasonal::SeasonalCalendar;
use crate::shared::errors::ForecastError;
use crate::shared::types::{
    ForecastOutcome, ForecastResult, Marketplace, SaleEvent, SuppressReason,
};
use crate::shared::utils::{round2, round3};

pub const MIN_POINTS_ANY: usize = 3;
pub const MIN_POINTS_MODEL: usize = 10;
pub const MAPE_THRESHOLD: f64 = 0.25;

/// ~30-day horizon extrapolated from ~7-day-granularity signal.
const HORIZON_FACTOR: f64 = 30.0 / 7.0;
const BLEND_PROJECTION: f64 = 0.7;
const BLEND_SMOOTHED: f64 = 0.3;
const VOLATILITY_CLAMP: f64 = 2.5;

/// Short-horizon price forecaster. State-free per call: a pure function of
/// (history, category, marketplace) plus the sale-event calendar. The
/// contract is "forecast when evidence supports it, otherwise say nothing" -
/// a suppressed forecast is an outcome, not an error.
pub struct Forecaster {
    seasonal: SeasonalCalendar,
    refiner: Option<Arc<dyn RegressionRefiner>>,
    base_currency: String,
}

impl Forecaster {
    pub fn new(
        base_currency: &str,
        refiner: Option<Arc<dyn RegressionRefiner>>,
    ) -> Self {
        Self {
            seasonal: SeasonalCalendar::new(),
            refiner,
            base_currency: base_currency.to_string(),
        }
    }

    /// Forecast over a chronologically ordered, base-currency price series.
    pub fn predict(
        &self,
        history: &[f64],
        category: &str,
        marketplace: Marketplace,
        events: &[SaleEvent],
    ) -> Result<ForecastOutcome, ForecastError> {
        let now = Utc::now();
        self.predict_at(
            history,
            category,
            marketplace,
            events,
            now.date_naive(),
            now.month(),
        )
    }

    /// Same as `predict` with the clock pinned, for deterministic tests.
    pub fn predict_at(
        &self,
        history: &[f64],
        category: &str,
        marketplace: Marketplace,
        events: &[SaleEvent],
        today: NaiveDate,
        month: u32,
    ) -> Result<ForecastOutcome, ForecastError> {
        if category.trim().is_empty() {
            return Err(ForecastError::InvalidInput("empty category".to_string()));
        }
        if let Some(bad) = history.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(ForecastError::InvalidInput(format!(
                "invalid price in history: {}",
                bad
            )));
        }

        // Minimum-data gate, before any feature extraction.
        if history.len() < MIN_POINTS_ANY {
            return Ok(ForecastOutcome::NoForecast(SuppressReason::InsufficientData));
        }
        let Some(feats) = features::extract_with_month(history, marketplace, month) else {
            return Ok(ForecastOutcome::NoForecast(SuppressReason::InsufficientData));
        };

        // Base projection: extrapolate the latest delta to the horizon.
        let mut projected = feats.last + feats.trend * HORIZON_FACTOR;

        let sale_discount = self.seasonal.sale_event_discount(events, today);
        projected *= 1.0 - sale_discount / 100.0;

        // Damp single-step noise against the rolling mean.
        let smoothed = feats.roll_mean;
        projected = BLEND_PROJECTION * projected + BLEND_SMOOTHED * smoothed;

        // Best-effort model refinement; a poor model rejects the whole
        // forecast, an unavailable or failing one is silently skipped.
        if feats.count >= MIN_POINTS_MODEL {
            if let Some(refiner) = &self.refiner {
                match refiner.fit_predict(&feats, feats.last) {
                    Ok(model_prediction) => {
                        if let Some(reason) = Self::validate_on_holdout(&feats, model_prediction) {
                            return Ok(ForecastOutcome::NoForecast(reason));
                        }
                        projected =
                            BLEND_PROJECTION * model_prediction + BLEND_SMOOTHED * smoothed;
                    }
                    Err(e) => {
                        warn!("Model refinement failed, keeping heuristic: {}", e);
                    }
                }
            }
        }

        // Bound the jump by observed volatility, then floor at zero.
        if feats.volatility > 0.0 {
            let max_jump = feats.volatility * VOLATILITY_CLAMP;
            projected = projected
                .min(feats.last + max_jump)
                .max(feats.last - max_jump);
        }
        projected = projected.max(0.0);

        match confidence::assess(projected, feats.last, feats.volatility, feats.count) {
            Ok(confidence_score) => Ok(ForecastOutcome::Forecast(ForecastResult {
                current_price: round2(feats.last),
                forecast_price: round2(projected),
                confidence: confidence_score,
                volatility: round3(feats.volatility),
                trend: round2(feats.trend),
                points: feats.count,
                sale_discount,
                base_currency: self.base_currency.clone(),
            })),
            Err(reason) => {
                debug!("Forecast suppressed: {}", reason);
                Ok(ForecastOutcome::NoForecast(reason))
            }
        }
    }

    /// Holdout validation on the most recent ~20% of points (minimum 2).
    /// The model prediction is constant over the slice; MAPE above the
    /// threshold rejects the forecast entirely.
    fn validate_on_holdout(feats: &PriceFeatures, model_prediction: f64) -> Option<SuppressReason> {
        let holdout_len = (feats.count / 5).max(2);
        let holdout_start = feats.count.saturating_sub(holdout_len);
        let holdout = &feats.values[holdout_start..];
        if holdout.is_empty() {
            return None;
        }
        let predictions = vec![model_prediction; holdout.len()];
        let score = mape(holdout, &predictions);
        if score > MAPE_THRESHOLD {
            debug!("Holdout MAPE {:.3} above threshold", score);
            return Some(SuppressReason::QualityRejected);
        }
        None
    }
}
