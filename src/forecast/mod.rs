//! Chronological train/test splits and Holt-Winters forecasting.

pub mod models;
pub mod params;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use crate::common::types::{ConsumptionTable, SeriesIndex, TimeSeries};
use crate::error::{EnergyError, Result};
use crate::seasonality::best_season_length;
use models::{fit_holt_winters, HoltWintersFit};
use params::{ForecastMethod, ForecastParams};

/// Forecast values laid out on the continuation of the input series' index.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    pub index: SeriesIndex,
    pub values: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl ForecastSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Timestamps of the forecast points, or `None` for a positional index.
    pub fn timestamps(&self) -> Option<&[NaiveDateTime]> {
        match &self.index {
            SeriesIndex::Timestamps(ts) => Some(ts),
            SeriesIndex::Positional { .. } => None,
        }
    }
}

/// Hold-out accuracy of a forecast against observed values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastAccuracy {
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error; `None` when an actual value is zero.
    pub mape: Option<f64>,
}

/// Splits series chronologically and forecasts them.
///
/// Keeps the most recently fitted model. Every forecast refits from scratch
/// and replaces it; a failed fit leaves no model behind.
#[derive(Debug, Default)]
pub struct EnergyForecaster {
    model: Option<HoltWintersFit>,
}

impl EnergyForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// The model fitted by the last successful forecast.
    pub fn model(&self) -> Option<&HoltWintersFit> {
        self.model.as_ref()
    }

    /// Split a table into a leading train part and a trailing test part.
    ///
    /// The test part holds `ceil(test_fraction * n)` rows. Rows are never
    /// shuffled. `target_column` must exist in the table.
    pub fn split(
        &self,
        table: &ConsumptionTable,
        target_column: &str,
        test_fraction: f64,
    ) -> Result<(ConsumptionTable, ConsumptionTable)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(EnergyError::Config(format!(
                "test_fraction must be between 0 and 1 (exclusive), got {}",
                test_fraction
            )));
        }
        table.column(target_column)?;

        let n = table.len();
        let n_test = test_rows(n, test_fraction);
        let n_train = n - n_test;
        if n_train == 0 {
            return Err(EnergyError::Config(format!(
                "test_fraction {} leaves no training rows out of {}",
                test_fraction, n
            )));
        }

        debug!(n, n_train, n_test, "split table chronologically");
        Ok((table.slice(0..n_train), table.slice(n_train..n)))
    }

    /// Forecast `periods` values past the end of `series`.
    ///
    /// `seasonal_periods = None` detects the cycle length from the data.
    /// Intervals are at 95% confidence; use
    /// [`forecast_with`](Self::forecast_with) for other levels.
    pub fn forecast(
        &mut self,
        series: &TimeSeries,
        periods: usize,
        method: ForecastMethod,
        seasonal_periods: Option<usize>,
    ) -> Result<ForecastSeries> {
        self.forecast_with(
            series,
            &ForecastParams {
                periods,
                method,
                seasonal_periods,
                ..Default::default()
            },
        )
    }

    /// Forecast using explicit [`ForecastParams`].
    pub fn forecast_with(
        &mut self,
        series: &TimeSeries,
        params: &ForecastParams,
    ) -> Result<ForecastSeries> {
        params.validate()?;
        self.model = None;

        let season_length = match params.seasonal_periods {
            Some(m) => m,
            None => {
                let m = best_season_length(&series.values).map_err(EnergyError::Fit)?;
                debug!(season_length = m, "detected seasonal period");
                m
            }
        };

        let fit = match params.method {
            ForecastMethod::HoltWinters => {
                fit_holt_winters(&series.values, season_length).map_err(EnergyError::Fit)?
            }
        };
        let forecast = fit
            .forecast(params.periods, params.confidence_level)
            .map_err(EnergyError::Fit)?;

        info!(
            method = %params.method,
            n = series.len(),
            season_length,
            periods = params.periods,
            "fitted forecast model"
        );
        self.model = Some(fit);

        Ok(ForecastSeries {
            index: series.continuation(params.periods),
            values: forecast.point,
            lower: forecast.lower,
            upper: forecast.upper,
        })
    }

    /// Fit on `train`, forecast `test.len()` steps and score against `test`.
    pub fn evaluate(
        &mut self,
        train: &TimeSeries,
        test: &TimeSeries,
        params: &ForecastParams,
    ) -> Result<ForecastAccuracy> {
        if test.is_empty() {
            return Err(EnergyError::Config(
                "cannot evaluate against an empty test series".into(),
            ));
        }

        let params = ForecastParams {
            periods: test.len(),
            ..params.clone()
        };
        let forecast = self.forecast_with(train, &params)?;
        Ok(accuracy(&forecast.values, &test.values))
    }
}

/// Rows assigned to the test part: `ceil(fraction * n)`, ignoring
/// floating-point noise just above a whole number.
fn test_rows(n: usize, fraction: f64) -> usize {
    let exact = fraction * n as f64;
    let rounded = exact.round();
    if (exact - rounded).abs() < 1e-9 {
        rounded as usize
    } else {
        exact.ceil() as usize
    }
}

fn accuracy(predicted: &[f64], actual: &[f64]) -> ForecastAccuracy {
    let n = actual.len() as f64;
    let errors: Vec<f64> = predicted.iter().zip(actual).map(|(p, a)| a - p).collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
    let mape = if actual.iter().any(|a| *a == 0.0) {
        None
    } else {
        Some(
            errors
                .iter()
                .zip(actual)
                .map(|(e, a)| (e / a).abs())
                .sum::<f64>()
                / n
                * 100.0,
        )
    };

    ForecastAccuracy { mae, rmse, mape }
}
