//! SVG charts of consumption trends, usage patterns and forecasts.

pub mod figure;

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::{DateTime, NaiveDateTime};
use plotters::prelude::*;
use tracing::debug;

use crate::analysis::{timestamps_of, PatternProfile, PatternType};
use crate::common::types::{ConsumptionTable, SeriesIndex, TimeSeries};
use crate::error::{EnergyError, Result};
use crate::forecast::ForecastSeries;

pub use figure::{Figure, FigureSize};

const TREND_TITLE: &str = "Energy Consumption Trend";
const FORECAST_TITLE: &str = "Energy Consumption Forecast";
const FONT: &str = "sans-serif";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Two days in milliseconds; longer spans label dates without times.
const DATE_ONLY_SPAN_MS: i64 = 2 * 86_400_000;

fn render_err<E: std::fmt::Display>(e: E) -> EnergyError {
    EnergyError::Render(e.to_string())
}

/// Renders charts into [`Figure`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyVisualizer;

impl EnergyVisualizer {
    pub fn new() -> Self {
        EnergyVisualizer
    }

    /// Line chart of consumption over time.
    ///
    /// Rows missing either the date or the consumption value are skipped. Text
    /// date columns are parsed.
    pub fn plot_trend(
        &self,
        table: &ConsumptionTable,
        date_column: &str,
        consumption_column: &str,
        size: FigureSize,
    ) -> Result<Figure> {
        size.validate()?;
        let dates = timestamps_of(table, date_column)?;
        let values = table.floats(consumption_column)?;

        let points: Vec<(i64, f64)> = dates
            .iter()
            .zip(values.iter())
            .filter_map(|(d, v)| Some((millis(&(*d)?), (*v)?)))
            .collect();

        let (x_range, y_range) = bounds(points.iter().copied());
        let label = date_formatter(&x_range);
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (size.width, size.height))
                .into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(TREND_TITLE, (FONT, 24))
                .margin(10)
                .x_label_area_size(110)
                .y_label_area_size(80)
                .build_cartesian_2d(x_range, y_range)
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .x_desc("Date")
                .y_desc("Consumption")
                .x_label_formatter(&label)
                .x_label_style((FONT, 12).into_font().transform(FontTransform::Rotate90))
                .draw()
                .map_err(render_err)?;

            chart
                .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
                .map_err(render_err)?;
            root.present().map_err(render_err)?;
        }

        debug!(points = points.len(), "rendered trend chart");
        Ok(Figure::new(TREND_TITLE, "Date", "Consumption", size, points.len(), svg))
    }

    /// Marker line of average consumption against the pattern's key.
    ///
    /// An empty profile for `pattern` is a schema error.
    pub fn plot_pattern(
        &self,
        profile: &PatternProfile,
        pattern: PatternType,
        size: FigureSize,
    ) -> Result<Figure> {
        size.validate()?;
        let values = profile.get(pattern);
        if values.is_empty() {
            return Err(EnergyError::Schema(format!(
                "Pattern type {}_pattern not found in patterns",
                pattern
            )));
        }

        let title = format!("{} Consumption Pattern", pattern.title());
        let x_label = pattern.axis_label();
        let svg = render_pattern(values, pattern, &title, size)?;

        debug!(%pattern, points = values.len(), "rendered pattern chart");
        Ok(Figure::new(title, x_label, "Average Consumption", size, values.len(), svg))
    }

    /// History and forecast on one chart, with the prediction interval bounds.
    ///
    /// Both series must use the same kind of index.
    pub fn plot_forecast(
        &self,
        history: &TimeSeries,
        forecast: &ForecastSeries,
        size: FigureSize,
    ) -> Result<Figure> {
        size.validate()?;
        let (hist_x, fc_x, dated) = match (&history.index, &forecast.index) {
            (SeriesIndex::Timestamps(h), SeriesIndex::Timestamps(f)) => {
                (h.iter().map(millis).collect(), f.iter().map(millis).collect(), true)
            }
            (SeriesIndex::Positional { start: h }, SeriesIndex::Positional { start: f }) => (
                positions(*h, history.len()),
                positions(*f, forecast.len()),
                false,
            ),
            _ => {
                return Err(EnergyError::Schema(
                    "history and forecast must both be indexed by timestamps or by position"
                        .into(),
                ))
            }
        };
        let hist: Vec<(i64, f64)> = zip_points(&hist_x, &history.values);
        let point: Vec<(i64, f64)> = zip_points(&fc_x, &forecast.values);
        let lower: Vec<(i64, f64)> = zip_points(&fc_x, &forecast.lower);
        let upper: Vec<(i64, f64)> = zip_points(&fc_x, &forecast.upper);

        let (x_range, y_range) = bounds(
            hist.iter()
                .chain(point.iter())
                .chain(lower.iter())
                .chain(upper.iter())
                .copied(),
        );
        let x_desc = if dated { "Date" } else { "Step" };
        let date_label = date_formatter(&x_range);
        let step_label = |x: &i64| x.to_string();
        let label: &dyn Fn(&i64) -> String = if dated { &date_label } else { &step_label };

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (size.width, size.height))
                .into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(FORECAST_TITLE, (FONT, 24))
                .margin(10)
                .x_label_area_size(110)
                .y_label_area_size(80)
                .build_cartesian_2d(x_range, y_range)
                .map_err(render_err)?;

            chart
                .configure_mesh()
                .x_desc(x_desc)
                .y_desc("Consumption")
                .x_label_formatter(label)
                .x_label_style((FONT, 12).into_font().transform(FontTransform::Rotate90))
                .draw()
                .map_err(render_err)?;

            chart
                .draw_series(LineSeries::new(hist.iter().copied(), &BLUE))
                .map_err(render_err)?
                .label("History")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
            chart
                .draw_series(LineSeries::new(point.iter().copied(), &RED))
                .map_err(render_err)?
                .label("Forecast")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
            let band = RED.mix(0.35);
            chart
                .draw_series(LineSeries::new(lower.iter().copied(), band))
                .map_err(render_err)?
                .label("Prediction interval")
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], band));
            chart
                .draw_series(LineSeries::new(upper.iter().copied(), band))
                .map_err(render_err)?;

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(render_err)?;
            root.present().map_err(render_err)?;
        }

        let points = hist.len() + point.len();
        debug!(history = hist.len(), forecast = point.len(), "rendered forecast chart");
        Ok(Figure::new(FORECAST_TITLE, x_desc, "Consumption", size, points, svg))
    }
}

fn render_pattern(
    values: &BTreeMap<u32, f64>,
    pattern: PatternType,
    title: &str,
    size: FigureSize,
) -> Result<String> {
    let points: Vec<(i32, f64)> = values.iter().map(|(&k, &v)| (k as i32, v)).collect();
    let x_min = points.first().map_or(0, |p| p.0) - 1;
    let x_max = points.last().map_or(0, |p| p.0) + 1;
    let (_, y_range) = bounds(points.iter().map(|&(x, y)| (x as i64, y)));

    let key_label = |k: &i32| key_name(pattern, *k);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (size.width, size.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (FONT, 24))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(80)
            .build_cartesian_2d(x_min..x_max, y_range)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc(pattern.axis_label())
            .y_desc("Average Consumption")
            .x_labels((x_max - x_min + 1) as usize)
            .x_label_formatter(&key_label)
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), &BLUE).point_size(4))
            .map_err(render_err)?;
        root.present().map_err(render_err)?;
    }
    Ok(svg)
}

/// Axis label for a pattern key; keys outside the pattern's domain stay blank.
fn key_name(pattern: PatternType, key: i32) -> String {
    if key < 0 || !pattern.key_domain().contains(&(key as u32)) {
        return String::new();
    }
    match pattern {
        PatternType::Daily => key.to_string(),
        PatternType::Weekly => WEEKDAYS[key as usize].to_string(),
        PatternType::Monthly => MONTHS[key as usize - 1].to_string(),
    }
}

fn millis(t: &NaiveDateTime) -> i64 {
    t.and_utc().timestamp_millis()
}

fn positions(start: usize, len: usize) -> Vec<i64> {
    (start..start + len).map(|i| i as i64).collect()
}

fn zip_points(xs: &[i64], ys: &[f64]) -> Vec<(i64, f64)> {
    xs.iter().copied().zip(ys.iter().copied()).collect()
}

/// Axis ranges covering every point, padded so a single point or a flat
/// line still gets a non-empty range.
fn bounds(points: impl Iterator<Item = (i64, f64)>) -> (Range<i64>, Range<f64>) {
    let mut x = (i64::MAX, i64::MIN);
    let mut y = (f64::INFINITY, f64::NEG_INFINITY);
    for (px, py) in points {
        x = (x.0.min(px), x.1.max(px));
        if py.is_finite() {
            y = (y.0.min(py), y.1.max(py));
        }
    }
    if x.0 > x.1 {
        x = (0, 1);
    } else if x.0 == x.1 {
        x = (x.0 - 1, x.1 + 1);
    }
    if y.0 > y.1 {
        y = (0.0, 1.0);
    }
    let pad = if y.1 > y.0 { (y.1 - y.0) * 0.05 } else { y.0.abs().max(1.0) * 0.05 };
    (x.0..x.1, (y.0 - pad)..(y.1 + pad))
}

/// Formats epoch-millisecond ticks as dates, with times on short spans.
fn date_formatter(range: &Range<i64>) -> impl Fn(&i64) -> String {
    let layout = if range.end - range.start >= DATE_ONLY_SPAN_MS {
        "%Y-%m-%d"
    } else {
        "%Y-%m-%d %H:%M"
    };
    move |ms: &i64| {
        DateTime::from_timestamp_millis(*ms)
            .map(|dt| dt.format(layout).to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::EnergyAnalyzer;
    use crate::common::types::Column;
    use crate::forecast::params::ForecastMethod;
    use crate::forecast::EnergyForecaster;
    use chrono::{Duration, NaiveDate};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn daily_table(days: i64) -> ConsumptionTable {
        ConsumptionTable::new(vec![
            Column::timestamp("date", (0..days).map(|i| Some(start() + Duration::days(i))).collect()),
            Column::float(
                "quantity",
                (0..days).map(|i| Some(100.0 + (i % 7) as f64 * 10.0)).collect(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_plot_trend_labels_and_points() {
        let table = ConsumptionTable::new(vec![
            Column::timestamp("date", (0..30).map(|i| Some(start() + Duration::days(i))).collect()),
            Column::float(
                "quantity",
                (0..30).map(|i| if i == 3 { None } else { Some(50.0 + i as f64) }).collect(),
            ),
        ])
        .unwrap();

        let figure = EnergyVisualizer::new()
            .plot_trend(&table, "date", "quantity", FigureSize::trend())
            .unwrap();
        assert_eq!(figure.title(), "Energy Consumption Trend");
        assert_eq!(figure.points(), 29);
        assert_eq!(figure.size(), FigureSize::new(1200, 600));
        assert!(figure.svg().starts_with("<svg"));
        assert!(figure.svg().contains("Energy Consumption Trend"));
        assert!(figure.svg().contains("Date"));
        assert!(figure.svg().contains("Consumption"));
        assert!(figure.svg().contains("2024-04"));
    }

    #[test]
    fn test_plot_trend_parses_text_dates() {
        let table = ConsumptionTable::new(vec![
            Column::text(
                "date",
                (0..10)
                    .map(|i| Some((start() + Duration::days(i)).format("%Y-%m-%d").to_string()))
                    .collect(),
            ),
            Column::float("quantity", (0..10).map(|i| Some(i as f64)).collect()),
        ])
        .unwrap();

        let figure = EnergyVisualizer::new()
            .plot_trend(&table, "date", "quantity", FigureSize::trend())
            .unwrap();
        assert_eq!(figure.points(), 10);
        assert!(figure.svg().contains("2024-04"));
    }

    #[test]
    fn test_plot_trend_missing_column() {
        let err = EnergyVisualizer::new()
            .plot_trend(&daily_table(3), "date", "kwh", FigureSize::trend())
            .unwrap_err();
        assert!(matches!(err, EnergyError::Schema(_)));
    }

    #[test]
    fn test_plot_trend_rejects_zero_size() {
        let err = EnergyVisualizer::new()
            .plot_trend(&daily_table(3), "date", "quantity", FigureSize::new(0, 600))
            .unwrap_err();
        assert!(matches!(err, EnergyError::Config(_)));
    }

    #[test]
    fn test_plot_weekly_pattern() {
        let profile = EnergyAnalyzer::new()
            .detect_patterns(&daily_table(28), "quantity", "date")
            .unwrap();
        let figure = EnergyVisualizer::new()
            .plot_pattern(&profile, PatternType::Weekly, FigureSize::pattern())
            .unwrap();

        assert_eq!(figure.title(), "Weekly Consumption Pattern");
        assert_eq!(figure.x_label(), "Day of Week");
        assert_eq!(figure.y_label(), "Average Consumption");
        assert_eq!(figure.points(), 7);
        assert!(figure.svg().contains("Weekly Consumption Pattern"));
        assert!(figure.svg().contains("Day of Week"));
        assert!(figure.svg().contains("Mon"));
    }

    #[test]
    fn test_plot_pattern_empty_is_schema_error() {
        let err = EnergyVisualizer::new()
            .plot_pattern(&PatternProfile::default(), PatternType::Daily, FigureSize::pattern())
            .unwrap_err();
        assert!(matches!(err, EnergyError::Schema(_)));
    }

    #[test]
    fn test_plot_forecast_and_save() {
        let series = daily_table(28).series("date", "quantity").unwrap();
        let forecast = EnergyForecaster::new()
            .forecast(&series, 7, ForecastMethod::HoltWinters, Some(7))
            .unwrap();
        let figure = EnergyVisualizer::new()
            .plot_forecast(&series, &forecast, FigureSize::trend())
            .unwrap();
        assert_eq!(figure.points(), 35);
        assert!(figure.svg().contains("Prediction interval"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast.svg");
        figure.save(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, figure.svg());

        let err = figure.save(dir.path().join("missing").join("f.svg")).unwrap_err();
        assert!(matches!(err, EnergyError::Render(_)));
    }

    #[test]
    fn test_plot_forecast_rejects_mixed_indices() {
        let history = TimeSeries::from_values(vec![1.0; 4]);
        let forecast = ForecastSeries {
            index: SeriesIndex::Timestamps(vec![start()]),
            values: vec![1.0],
            lower: vec![0.0],
            upper: vec![2.0],
        };
        assert!(matches!(
            EnergyVisualizer::new().plot_forecast(&history, &forecast, FigureSize::trend()),
            Err(EnergyError::Schema(_))
        ));
    }

    #[test]
    fn test_key_names() {
        assert_eq!(key_name(PatternType::Weekly, 0), "Mon");
        assert_eq!(key_name(PatternType::Monthly, 12), "Dec");
        assert_eq!(key_name(PatternType::Daily, 23), "23");
        assert_eq!(key_name(PatternType::Monthly, 0), "");
        assert_eq!(key_name(PatternType::Weekly, -1), "");
    }

    #[test]
    fn test_bounds_pad_flat_and_single_points() {
        let (x, y) = bounds(vec![(5, 10.0)].into_iter());
        assert_eq!(x, 4..6);
        assert!(y.start < 10.0 && y.end > 10.0);
        let (x, _) = bounds(std::iter::empty());
        assert_eq!(x, 0..1);
    }
}
