//! Seasonal period detection for consumption series.

pub mod detection;

pub use detection::{best_season_length, detect_seasonality, SeasonalPeriod};
