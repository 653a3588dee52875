use augurs_seasons::PeriodogramDetector;
use tracing::debug;

/// A seasonal period found in a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonalPeriod {
    /// Cycle length in samples (e.g. 24 for hourly readings with a daily cycle).
    pub period: usize,
    /// Autocorrelation at `period`, clamped to 0.0 - 1.0.
    pub strength: f64,
}

/// Minimum number of readings required for seasonality detection.
pub const MIN_SEASONALITY_POINTS: usize = 8;

/// Minimum spectral power (as fraction of max) to consider a period as candidate.
const PERIODOGRAM_POWER_THRESHOLD: f64 = 0.01;

/// Maximum number of candidate periods to validate with autocorrelation.
const MAX_CANDIDATES: usize = 20;

/// Minimum autocorrelation strength to report a seasonal period.
const MIN_SEASONALITY_STRENGTH: f64 = 0.1;

/// Minimum strength for a period to drive a Holt-Winters fit.
const MIN_MODEL_STRENGTH: f64 = 0.3;

/// Lags either side of a periodogram candidate checked by autocorrelation.
const PERIOD_SEARCH_RADIUS: usize = 2;

/// Strength gap within which a shorter period beats its own multiples.
const HARMONIC_TOLERANCE: f64 = 0.01;

/// Detect seasonal periods in evenly spaced readings.
///
/// Candidates come from the `augurs-seasons` periodogram (strongest spectral
/// power first); each is then snapped to the best nearby lag and scored by the
/// autocorrelation there. Only periods up to half the series length and with
/// strength above 0.1 are kept, sorted by descending strength. Constant input has no seasonality.
pub fn detect_seasonality(values: &[f64]) -> Result<Vec<SeasonalPeriod>, String> {
    if values.len() < MIN_SEASONALITY_POINTS {
        return Err(format!(
            "Need at least {} data points for seasonality detection, got {}",
            MIN_SEASONALITY_POINTS,
            values.len()
        ));
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    if variance < 1e-10 {
        return Ok(Vec::new());
    }

    let max_period = (values.len() / 2) as u32;
    let detector = PeriodogramDetector::builder()
        .min_period(2)
        .max_period(max_period)
        .build();
    let periodogram = detector.periodogram(values);

    let max_power = periodogram
        .powers
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    if max_power <= 0.0 || !max_power.is_finite() {
        return Ok(Vec::new());
    }

    let mut candidates: Vec<(u32, f64)> = periodogram
        .periods
        .iter()
        .zip(periodogram.powers.iter())
        .filter(|(_, &power)| power > max_power * PERIODOGRAM_POWER_THRESHOLD)
        .map(|(&period, &power)| (period, power))
        .collect();
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(MAX_CANDIDATES);

    let mut results: Vec<SeasonalPeriod> = candidates
        .into_iter()
        .filter_map(|(period, _power)| {
            let (period, strength) =
                refine_period(values, period as usize, max_period as usize, mean, variance);
            (strength > MIN_SEASONALITY_STRENGTH).then(|| SeasonalPeriod {
                period,
                strength: strength.clamp(0.0, 1.0),
            })
        })
        .collect();
    results.sort_by_key(|r| r.period);
    results.dedup_by_key(|r| r.period);
    results.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!(
        n = values.len(),
        found = results.len(),
        "seasonality detection finished"
    );
    Ok(results)
}

/// The seasonal period to fit a Holt-Winters model with.
///
/// Picks the strongest detected period, provided its strength exceeds 0.3.
/// Multiples of a cycle correlate as strongly as the cycle itself, so among
/// periods within 0.01 of the best strength the shortest wins.
pub fn best_season_length(values: &[f64]) -> Result<usize, String> {
    let results = detect_seasonality(values)?;
    let best = match results.first() {
        Some(best) if best.strength > MIN_MODEL_STRENGTH => best.strength,
        Some(best) => {
            return Err(format!(
                "no seasonal period detected (strongest candidate {} has strength {:.2})",
                best.period, best.strength
            ))
        }
        None => return Err("no seasonal period detected".to_string()),
    };

    results
        .iter()
        .filter(|r| r.strength >= best - HARMONIC_TOLERANCE)
        .map(|r| r.period)
        .min()
        .ok_or_else(|| "no seasonal period detected".to_string())
}

/// The lag near `period` with the highest autocorrelation, and that autocorrelation.
///
/// Periodogram frequencies sit on a power-of-two grid, so a candidate can be
/// off by a sample or two from the true cycle length.
fn refine_period(
    values: &[f64],
    period: usize,
    max_period: usize,
    mean: f64,
    variance: f64,
) -> (usize, f64) {
    let lo = period.saturating_sub(PERIOD_SEARCH_RADIUS).max(2);
    let hi = (period + PERIOD_SEARCH_RADIUS).min(max_period);
    (lo..=hi)
        .map(|lag| (lag, autocorrelation_at_lag(values, lag, mean, variance)))
        .fold((period, f64::NEG_INFINITY), |best, cur| {
            if cur.1 > best.1 {
                cur
            } else {
                best
            }
        })
}

/// Autocorrelation of the series at `lag`, between -1.0 and 1.0.
fn autocorrelation_at_lag(values: &[f64], lag: usize, mean: f64, variance: f64) -> f64 {
    if lag >= values.len() || variance < 1e-10 {
        return 0.0;
    }

    let valid_pairs = (values.len() - lag) as f64;
    let covariance: f64 = values[..values.len() - lag]
        .iter()
        .zip(values[lag..].iter())
        .map(|(a, b)| (a - mean) * (b - mean))
        .sum::<f64>()
        / valid_pairs;

    covariance / variance
}
