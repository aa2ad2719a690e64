//! Common types used across the application

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed set of supported marketplaces. Ordering matters: it defines the
/// one-hot layout of the feature vector.
pub const MARKETPLACES: [Marketplace; 3] = [
    Marketplace::Amazon,
    Marketplace::Wildberries,
    Marketplace::Ozon,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    Amazon,
    Wildberries,
    Ozon,
}

impl Marketplace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Marketplace::Amazon => "amazon",
            Marketplace::Wildberries => "wildberries",
            Marketplace::Ozon => "ozon",
        }
    }

    pub fn parse(value: &str) -> Option<Marketplace> {
        match value.trim().to_lowercase().as_str() {
            "amazon" => Some(Marketplace::Amazon),
            "wildberries" | "wb" => Some(Marketplace::Wildberries),
            "ozon" => Some(Marketplace::Ozon),
            _ => None,
        }
    }
}

impl std::fmt::Display for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed marketplace listing for a searched product.
/// Immutable once created; later observations supersede, never update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub marketplace: Marketplace,
    pub rating: Option<f64>,
    pub url: String,
    pub image_url: String,
    pub parsed_at: DateTime<Utc>,
}

/// Append-only price observation for a tracked query/marketplace pair.
/// Stored in the currency it was collected in; normalization to the base
/// currency happens at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    pub currency: String,
    pub marketplace: Marketplace,
    pub collected_at: DateTime<Utc>,
}

/// A "product name + category" pair being monitored.
#[derive(Debug, Clone)]
pub struct TrackedQuery {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub marketplaces: Vec<Marketplace>,
    pub created_at: DateTime<Utc>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl TrackedQuery {
    pub fn new(name: &str, category: &str, marketplaces: Vec<Marketplace>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.to_string(),
            marketplaces,
            created_at: Utc::now(),
            last_fetched_at: None,
        }
    }
}

/// Code -> rate-to-base mapping with a freshness timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub code: String,
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
}

/// A named promotional window with an expected discount magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleEvent {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub discount_hint: f64,
}

/// Forecast produced for one tracked query. Transient; computed fresh on
/// every request and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub current_price: f64,
    pub forecast_price: f64,
    pub confidence: f64,
    pub volatility: f64,
    pub trend: f64,
    pub points: usize,
    pub sale_discount: f64,
    pub base_currency: String,
}

/// Why a computed forecast was suppressed. Not an error: this is the
/// designed "insufficient evidence" outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Fewer than the minimum number of history points.
    InsufficientData,
    /// Refinement model failed holdout validation.
    QualityRejected,
    /// Projection deviates more than 50% from the current price.
    ExcessiveDeviation,
    /// Confidence score fell below the floor.
    LowConfidence,
}

impl std::fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SuppressReason::InsufficientData => "not enough price history",
            SuppressReason::QualityRejected => "model failed holdout validation",
            SuppressReason::ExcessiveDeviation => "projection deviates too far from current price",
            SuppressReason::LowConfidence => "confidence below threshold",
        };
        f.write_str(text)
    }
}

/// Outcome of a forecast request: either a forecast or a documented reason
/// why none is shown.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Forecast(ForecastResult),
    NoForecast(SuppressReason),
}

impl ForecastOutcome {
    pub fn forecast(&self) -> Option<&ForecastResult> {
        match self {
            ForecastOutcome::Forecast(result) => Some(result),
            ForecastOutcome::NoForecast(_) => None,
        }
    }
}

/// Seasonal purchase-timing recommendation for a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseTiming {
    pub best_month: u32,
    pub months_to_wait: u32,
    pub expected_discount: f64,
    pub recommendation: String,
}
