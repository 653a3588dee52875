use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};

/// Forecasting methods the forecaster knows how to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ForecastMethod {
    /// Additive trend, additive season exponential smoothing.
    #[default]
    #[serde(rename = "holt-winters", alias = "holt_winters", alias = "hw")]
    HoltWinters,
}

impl FromStr for ForecastMethod {
    type Err = EnergyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "holt-winters" | "holt_winters" | "hw" => Ok(ForecastMethod::HoltWinters),
            _ => Err(EnergyError::UnsupportedMethod(format!(
                "Method {} not supported. Valid methods: holt-winters",
                s
            ))),
        }
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForecastMethod::HoltWinters => f.write_str("holt-winters"),
        }
    }
}

/// Parameters for [`EnergyForecaster::forecast_with`](super::EnergyForecaster::forecast_with).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastParams {
    /// Number of future values to produce.
    pub periods: usize,
    pub method: ForecastMethod,
    /// Seasonal cycle length in samples; detected from the data when `None`.
    pub seasonal_periods: Option<usize>,
    /// Coverage of the prediction intervals, strictly between 0 and 1.
    pub confidence_level: f64,
}

impl Default for ForecastParams {
    fn default() -> Self {
        ForecastParams {
            periods: 24,
            method: ForecastMethod::HoltWinters,
            seasonal_periods: Some(24),
            confidence_level: 0.95,
        }
    }
}

impl ForecastParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(EnergyError::Config(format!(
                "confidence_level must be between 0.0 and 1.0 (exclusive), got {}",
                self.confidence_level
            )));
        }
        Ok(())
    }
}
