//! Application services and use cases

pub mod services;

pub use services::{ForecastService, OfferService};
