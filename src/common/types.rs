use std::collections::HashSet;
use std::ops::Range;

use chrono::{Duration, NaiveDateTime};

use crate::error::{EnergyError, Result};

/// Sampling interval assumed when a series has fewer than two timestamps.
pub const DEFAULT_INTERVAL_SECS: i64 = 86_400;

/// Typed storage for one column. Every cell is optional; `None` is a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Timestamp(Vec<Option<NaiveDateTime>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Timestamp(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable type name, used in schema error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ColumnData::Timestamp(_) => "timestamp",
            ColumnData::Float(_) => "float",
            ColumnData::Text(_) => "text",
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Timestamp(v) => v[row].is_none(),
            ColumnData::Float(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
        }
    }

    /// Number of missing cells in the column.
    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    fn cell(&self, row: usize) -> Cell {
        match self {
            ColumnData::Timestamp(v) => v[row].map_or(Cell::Missing, Cell::Timestamp),
            ColumnData::Float(v) => v[row].map_or(Cell::Missing, Cell::float),
            ColumnData::Text(v) => v[row].clone().map_or(Cell::Missing, Cell::Text),
        }
    }

    fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Timestamp(v) => ColumnData::Timestamp(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Float(v) => ColumnData::Float(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => {
                ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// A named column of a [`ConsumptionTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn timestamp(name: impl Into<String>, values: Vec<Option<NaiveDateTime>>) -> Self {
        Column {
            name: name.into(),
            data: ColumnData::Timestamp(values),
        }
    }

    pub fn float(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Column {
            name: name.into(),
            data: ColumnData::Float(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Column {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }
}

/// Hashable view of a single cell, used for full-row duplicate detection.
///
/// Floats compare by bit pattern with `-0.0` folded into `0.0`; missing cells
/// compare equal to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Missing,
    Timestamp(NaiveDateTime),
    Float(u64),
    Text(String),
}

impl Cell {
    fn float(v: f64) -> Cell {
        let v = if v == 0.0 { 0.0 } else { v };
        Cell::Float(v.to_bits())
    }
}

/// An ordered table of consumption records sharing a fixed column schema.
///
/// Rows have no identity beyond their position. The optional time index names
/// the timestamp column that time-aware operations (interpolation) run against.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionTable {
    columns: Vec<Column>,
    time_index: Option<String>,
    len: usize,
}

impl ConsumptionTable {
    /// Build a table from columns of equal length with unique names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let len = columns.first().map_or(0, |c| c.data.len());

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EnergyError::Schema(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
            if column.data.len() != len {
                return Err(EnergyError::Schema(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.data.len(),
                    len
                )));
            }
        }

        Ok(ConsumptionTable {
            columns,
            time_index: None,
            len,
        })
    }

    /// Mark a timestamp column as the table's time index.
    pub fn with_time_index(mut self, name: &str) -> Result<Self> {
        self.timestamps(name)?;
        self.time_index = Some(name.to_string());
        Ok(self)
    }

    /// The timestamp column used for time-aware operations, if any.
    pub fn time_index(&self) -> Option<&str> {
        self.time_index.as_deref()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Look up a column by name, failing with a schema error if it is absent.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| EnergyError::Schema(format!("Column {} not found in data", name)))
    }

    /// Values of a numeric column.
    pub fn floats(&self, name: &str) -> Result<&[Option<f64>]> {
        match &self.column(name)?.data {
            ColumnData::Float(v) => Ok(v),
            other => Err(EnergyError::Schema(format!(
                "column '{}' is {}, expected numeric values",
                name,
                other.kind()
            ))),
        }
    }

    /// Values of a timestamp column.
    pub fn timestamps(&self, name: &str) -> Result<&[Option<NaiveDateTime>]> {
        match &self.column(name)?.data {
            ColumnData::Timestamp(v) => Ok(v),
            other => Err(EnergyError::Schema(format!(
                "column '{}' is {}, expected timestamps",
                name,
                other.kind()
            ))),
        }
    }

    /// All cells of one row, in column order.
    pub fn row(&self, index: usize) -> Vec<Cell> {
        self.columns.iter().map(|c| c.data.cell(index)).collect()
    }

    /// Total number of missing cells across all columns.
    pub fn missing_cells(&self) -> usize {
        self.columns.iter().map(|c| c.data.missing_count()).sum()
    }

    /// True if any cell in the row is missing.
    pub fn row_has_missing(&self, index: usize) -> bool {
        self.columns.iter().any(|c| c.data.is_missing(index))
    }

    /// A new table holding the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> ConsumptionTable {
        ConsumptionTable {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.select(rows),
                })
                .collect(),
            time_index: self.time_index.clone(),
            len: rows.len(),
        }
    }

    /// A new table holding a contiguous range of rows.
    pub fn slice(&self, range: Range<usize>) -> ConsumptionTable {
        let rows: Vec<usize> = range.collect();
        self.select_rows(&rows)
    }

    /// Extract a time series from a timestamp column and a numeric column.
    ///
    /// Rows where either cell is missing are skipped; row order is preserved.
    pub fn series(&self, date_column: &str, value_column: &str) -> Result<TimeSeries> {
        let dates = self.timestamps(date_column)?;
        let values = self.floats(value_column)?;

        let (timestamps, values): (Vec<NaiveDateTime>, Vec<f64>) = dates
            .iter()
            .zip(values.iter())
            .filter_map(|(d, v)| Some(((*d)?, (*v)?)))
            .unzip();

        TimeSeries::new(timestamps, values)
    }
}

/// The index a series (or forecast) is laid out against.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesIndex {
    /// Plain row positions starting at `start`.
    Positional { start: usize },
    /// One timestamp per value.
    Timestamps(Vec<NaiveDateTime>),
}

/// A univariate series of consumption values.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub index: SeriesIndex,
    pub values: Vec<f64>,
}

impl TimeSeries {
    /// A series indexed by timestamps. Both vectors must have the same length.
    pub fn new(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(EnergyError::Schema(format!(
                "{} timestamps for {} values",
                timestamps.len(),
                values.len()
            )));
        }
        Ok(TimeSeries {
            index: SeriesIndex::Timestamps(timestamps),
            values,
        })
    }

    /// A series indexed by position, starting at 0.
    pub fn from_values(values: Vec<f64>) -> Self {
        TimeSeries {
            index: SeriesIndex::Positional { start: 0 },
            values,
        }
    }

    /// Returns the number of data points.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the series has no data points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the last timestamp, or None if empty or positionally indexed.
    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        match &self.index {
            SeriesIndex::Timestamps(ts) => ts.last().copied(),
            SeriesIndex::Positional { .. } => None,
        }
    }

    /// The index of `horizon` points following this series.
    ///
    /// Timestamps advance by the modal sampling interval of the series.
    pub fn continuation(&self, horizon: usize) -> SeriesIndex {
        match &self.index {
            SeriesIndex::Positional { start } => SeriesIndex::Positional {
                start: start + self.len(),
            },
            SeriesIndex::Timestamps(ts) => {
                let secs: Vec<i64> = ts.iter().map(|t| t.and_utc().timestamp()).collect();
                let step = Duration::seconds(detect_interval(&secs));
                let Some(last) = ts.last().copied() else {
                    return SeriesIndex::Timestamps(Vec::new());
                };
                SeriesIndex::Timestamps(
                    (1..=horizon as i32).map(|i| last + step * i).collect(),
                )
            }
        }
    }
}

/// Detect the most common interval (in seconds) between consecutive timestamps.
/// Returns one day if fewer than 2 data points or no positive interval.
pub fn detect_interval(timestamps: &[i64]) -> i64 {
    if timestamps.len() < 2 {
        return DEFAULT_INTERVAL_SECS;
    }

    let mut diffs: Vec<i64> = timestamps.windows(2).map(|w| w[1] - w[0]).collect();
    diffs.sort_unstable();

    // Mode of the sorted differences
    let mut best_val = diffs[0];
    let mut best_count = 1usize;
    let mut current_val = diffs[0];
    let mut current_count = 1usize;

    for &d in &diffs[1..] {
        if d == current_val {
            current_count += 1;
        } else {
            if current_count > best_count {
                best_count = current_count;
                best_val = current_val;
            }
            current_val = d;
            current_count = 1;
        }
    }
    if current_count > best_count {
        best_val = current_val;
    }

    if best_val <= 0 {
        return DEFAULT_INTERVAL_SECS;
    }

    best_val
}
