//! Feature extraction from a normalized price history.

use crate::shared::types::{Marketplace, MARKETPLACES};

pub const LAG_DEPTH: usize = 7;

/// Feature vector derived from a chronologically ordered, base-currency
/// price series. Feeds both the heuristic blend and the optional regression
/// refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFeatures {
    /// Most recent price.
    pub last: f64,
    pub mean: f64,
    /// Difference between the last two consecutive points (0 if n < 2).
    pub trend: f64,
    /// Population standard deviation over the full series (0 if n <= 1).
    pub volatility: f64,
    /// Current calendar month (1-12), the seasonality signal.
    pub month: u32,
    pub count: usize,
    /// Mean over the last min(3, n) points.
    pub roll_mean: f64,
    /// Population std over the last min(3, n) points.
    pub roll_std: f64,
    /// Prices at the last 7 steps walking backward; shorter histories are
    /// padded with the oldest available price.
    pub lags: [f64; LAG_DEPTH],
    /// Indicator over the fixed marketplace set.
    pub marketplace_one_hot: [f64; MARKETPLACES.len()],
    pub values: Vec<f64>,
}

/// Extract features from a non-empty series. The caller supplies the
/// calendar month so evaluation time stays under its control.
pub fn extract_with_month(
    values: &[f64],
    marketplace: Marketplace,
    month: u32,
) -> Option<PriceFeatures> {
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    let last = values[n - 1];
    let mean = values.iter().sum::<f64>() / n as f64;
    let trend = if n >= 2 { values[n - 1] - values[n - 2] } else { 0.0 };
    let volatility = population_std(values, mean);

    let mut lags = [0.0; LAG_DEPTH];
    for (i, lag) in lags.iter_mut().enumerate() {
        *lag = if n > i { values[n - 1 - i] } else { values[0] };
    }

    let window = &values[n.saturating_sub(3)..];
    let roll_mean = window.iter().sum::<f64>() / window.len() as f64;
    let roll_std = population_std(window, roll_mean);

    let mut marketplace_one_hot = [0.0; MARKETPLACES.len()];
    for (i, candidate) in MARKETPLACES.iter().enumerate() {
        if *candidate == marketplace {
            marketplace_one_hot[i] = 1.0;
        }
    }

    Some(PriceFeatures {
        last,
        mean,
        trend,
        volatility,
        month,
        count: n,
        roll_mean,
        roll_std,
        lags,
        marketplace_one_hot,
        values: values.to_vec(),
    })
}

fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
