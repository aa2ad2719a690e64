//! Domain layer - pure price analysis and forecasting logic

pub mod features;
pub mod forecast;
pub mod seasonal;
