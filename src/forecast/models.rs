use std::fmt;

use anofox_forecast::core::TimeSeries as ModelInput;
use anofox_forecast::models::exponential::{HoltWinters, SeasonalType};
use anofox_forecast::models::Forecaster;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

/// A fitted additive Holt-Winters model (additive trend, additive season).
///
/// The smoothing parameters are optimized by `anofox-forecast`; the public
/// fields are a snapshot of the fitted state.
#[derive(Serialize)]
pub struct HoltWintersFit {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub season_length: usize,
    /// Level after the last observation.
    pub level: f64,
    /// Trend after the last observation.
    pub trend: f64,
    /// Seasonal states, one per position in the cycle.
    pub seasonal: Vec<f64>,
    /// In-sample fitted values.
    pub fitted: Vec<f64>,
    n_obs: usize,
    #[serde(skip)]
    model: HoltWinters,
}

/// Point forecasts with prediction bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelForecast {
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl fmt::Debug for HoltWintersFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoltWintersFit")
            .field("alpha", &self.alpha)
            .field("beta", &self.beta)
            .field("gamma", &self.gamma)
            .field("season_length", &self.season_length)
            .field("level", &self.level)
            .field("trend", &self.trend)
            .field("n_obs", &self.n_obs)
            .finish_non_exhaustive()
    }
}

impl HoltWintersFit {
    /// Number of observations the model was fitted on.
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Forecast `horizon` steps past the last observation with bounds at
    /// `confidence_level`.
    pub fn forecast(&self, horizon: usize, confidence_level: f64) -> Result<ModelForecast, String> {
        if horizon == 0 {
            return Ok(ModelForecast {
                point: Vec::new(),
                lower: Vec::new(),
                upper: Vec::new(),
            });
        }

        let forecast = self
            .model
            .predict_with_intervals(horizon, confidence_level)
            .map_err(|e| format!("Holt-Winters prediction failed: {}", e))?;
        let point = forecast.primary().to_vec();
        let lower = forecast
            .lower_series(0)
            .map_err(|e| format!("Holt-Winters prediction has no lower bound: {}", e))?
            .to_vec();
        let upper = forecast
            .upper_series(0)
            .map_err(|e| format!("Holt-Winters prediction has no upper bound: {}", e))?
            .to_vec();

        if point.len() != horizon || lower.len() != horizon || upper.len() != horizon {
            return Err(format!(
                "Holt-Winters prediction returned {} values for horizon {}",
                point.len(),
                horizon
            ));
        }
        if let Some(h) = (0..horizon)
            .find(|&h| !(point[h].is_finite() && lower[h].is_finite() && upper[h].is_finite()))
        {
            return Err(format!(
                "Holt-Winters forecast produced a non-finite value at step {}",
                h + 1
            ));
        }

        Ok(ModelForecast { point, lower, upper })
    }
}

/// Fit an additive Holt-Winters model with seasonal period `season_length`.
///
/// Needs `season_length >= 2`, at least two full cycles, and finite values.
pub fn fit_holt_winters(values: &[f64], season_length: usize) -> Result<HoltWintersFit, String> {
    let n = values.len();
    if season_length < 2 {
        return Err(format!(
            "seasonal period must be at least 2, got {}",
            season_length
        ));
    }
    if n < 2 * season_length {
        return Err(format!(
            "Need at least {} data points (two seasonal cycles of {}), got {}",
            2 * season_length,
            season_length,
            n
        ));
    }
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(format!("series holds a non-finite value at position {}", pos));
    }

    let input = model_input(values)?;
    let mut model = HoltWinters::auto(season_length, SeasonalType::Additive);
    model
        .fit(&input)
        .map_err(|e| format!("Holt-Winters fit failed: {}", e))?;

    let state = (
        model.alpha(),
        model.beta(),
        model.gamma(),
        model.level(),
        model.trend(),
    );
    let (alpha, beta, gamma, level, trend) = match state {
        (Some(a), Some(b), Some(g), Some(l), Some(t)) => (a, b, g, l, t),
        _ => return Err("Holt-Winters fit left the model without state".to_string()),
    };
    let seasonal = model.seasonals().map(|s| s.to_vec()).unwrap_or_default();
    if [alpha, beta, gamma, level, trend]
        .iter()
        .chain(seasonal.iter())
        .any(|v| !v.is_finite())
    {
        return Err("Holt-Winters fit produced non-finite state".to_string());
    }
    let fitted = model.fitted_values().map(|f| f.to_vec()).unwrap_or_default();

    debug!(alpha, beta, gamma, season_length, "fitted Holt-Winters model");

    Ok(HoltWintersFit {
        alpha,
        beta,
        gamma,
        season_length,
        level,
        trend,
        seasonal,
        fitted,
        n_obs: n,
        model,
    })
}

/// Wrap raw values as a regularly spaced series; the model only reads the values.
fn model_input(values: &[f64]) -> Result<ModelInput, String> {
    let timestamps: Vec<DateTime<Utc>> = (0..values.len() as i64)
        .map(|i| DateTime::<Utc>::UNIX_EPOCH + Duration::hours(i))
        .collect();
    ModelInput::univariate(timestamps, values.to_vec())
        .map_err(|e| format!("Failed to build model input: {}", e))
}
