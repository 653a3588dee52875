//! Descriptive statistics and periodic usage profiles.

pub mod profile;

use chrono::{Datelike, NaiveDateTime, Timelike};
use statrs::statistics::{Data, Median, Statistics};
use tracing::debug;

use crate::common::grouping::group_means;
use crate::common::params::parse_timestamp;
use crate::common::types::{ColumnData, ConsumptionTable};
use crate::error::{EnergyError, Result};

pub use profile::{PatternProfile, PatternType, StatsSummary};

/// Statistics and pattern analysis over a [`ConsumptionTable`].
///
/// Holds no state; every method is a pure function of its arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyAnalyzer;

impl EnergyAnalyzer {
    pub fn new() -> Self {
        EnergyAnalyzer
    }

    /// Mean, median, sample standard deviation, min and max of a numeric column.
    ///
    /// Missing cells are ignored. A column with no values yields NaN in every
    /// field, and the standard deviation of a single value is NaN.
    pub fn basic_stats(&self, table: &ConsumptionTable, column: &str) -> Result<StatsSummary> {
        let values: Vec<f64> = table.floats(column)?.iter().flatten().copied().collect();
        if values.is_empty() {
            debug!(column, "no values to summarize");
            return Ok(StatsSummary::empty());
        }

        let median = Data::new(values.clone()).median();
        Ok(StatsSummary {
            mean: Statistics::mean(&values),
            median,
            std: Statistics::std_dev(&values),
            min: Statistics::min(&values),
            max: Statistics::max(&values),
        })
    }

    /// Average consumption by hour of day, day of week and month.
    ///
    /// A text date column is parsed on the fly; any non-missing cell that does
    /// not parse is a schema error. Rows missing either the timestamp or the
    /// consumption value are skipped.
    pub fn detect_patterns(
        &self,
        table: &ConsumptionTable,
        consumption_column: &str,
        date_column: &str,
    ) -> Result<PatternProfile> {
        let values = table.floats(consumption_column)?;
        let dates = timestamps_of(table, date_column)?;

        let readings: Vec<(NaiveDateTime, f64)> = dates
            .iter()
            .zip(values.iter())
            .filter_map(|(d, v)| Some(((*d)?, (*v)?)))
            .collect();

        let profile = PatternProfile {
            daily: group_means(readings.iter().map(|(t, v)| (t.hour(), *v))),
            weekly: group_means(readings.iter().map(|(t, v)| (t.weekday().num_days_from_monday(), *v))),
            monthly: group_means(readings.iter().map(|(t, v)| (t.month(), *v))),
        };
        debug!(
            readings = readings.len(),
            hours = profile.daily.len(),
            weekdays = profile.weekly.len(),
            months = profile.monthly.len(),
            "detected consumption patterns"
        );
        Ok(profile)
    }
}

/// Timestamps of `column`, parsing text cells when needed.
pub(crate) fn timestamps_of(
    table: &ConsumptionTable,
    column: &str,
) -> Result<Vec<Option<NaiveDateTime>>> {
    match &table.column(column)?.data {
        ColumnData::Timestamp(v) => Ok(v.clone()),
        ColumnData::Text(v) => v
            .iter()
            .map(|cell| match cell {
                None => Ok(None),
                Some(raw) => parse_timestamp(raw).map(Some).ok_or_else(|| {
                    EnergyError::Schema(format!(
                        "column '{}' holds '{}', which is not a date/time",
                        column, raw
                    ))
                }),
            })
            .collect(),
        ColumnData::Float(_) => Err(EnergyError::Schema(format!(
            "column '{}' is float, expected timestamps",
            column
        ))),
    }
}
