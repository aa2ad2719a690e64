//! Pricewatch - marketplace price tracker and forecast core
//! Built with Domain-Driven Design principles

pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod shared;

// Re-export main types for convenience
pub use application::{ForecastService, OfferService};
pub use domain::forecast::Forecaster;
pub use domain::seasonal::SeasonalCalendar;
pub use infrastructure::currency::CurrencyNormalizer;
pub use infrastructure::http::ResilientClient;
