//! Forecasting: heuristic projection, optional model refinement, and the
//! confidence gate.

pub mod confidence;
pub mod forecaster;
pub mod refiner;

pub use forecaster::Forecaster;
pub use refiner::{mape, BoostedRefiner, RegressionRefiner};
