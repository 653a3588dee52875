use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};

/// Layouts tried, in order, when a text column has to be read as timestamps.
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Options for [`DataProcessor::load_with`](crate::DataProcessor::load_with).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Column holding the reading timestamps.
    pub date_column: String,
    /// Column holding the consumption quantity.
    pub consumption_column: String,
    /// `strptime` layout for the date column; sniffed by DuckDB when unset.
    pub date_format: Option<String>,
    /// Field delimiter for delimited text; sniffed when unset.
    pub delimiter: Option<char>,
    /// Whether the first line is a header; sniffed when unset.
    pub has_header: Option<bool>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            date_column: "timestamp".to_string(),
            consumption_column: "consumption".to_string(),
            date_format: None,
            delimiter: None,
            has_header: None,
        }
    }
}

impl LoadOptions {
    pub fn new(date_column: &str, consumption_column: &str) -> Self {
        LoadOptions {
            date_column: date_column.to_string(),
            consumption_column: consumption_column.to_string(),
            ..Default::default()
        }
    }

    /// Reject options that cannot produce a valid query.
    pub fn validate(&self) -> Result<()> {
        if self.date_column.is_empty() || self.consumption_column.is_empty() {
            return Err(EnergyError::Config("column names cannot be empty".into()));
        }
        if self.date_column == self.consumption_column {
            return Err(EnergyError::Config(format!(
                "date and consumption columns must differ, both are '{}'",
                self.date_column
            )));
        }
        if matches!(self.date_format.as_deref(), Some("")) {
            return Err(EnergyError::Config("date_format cannot be empty".into()));
        }
        Ok(())
    }
}

/// How [`DataProcessor::clean`](crate::DataProcessor::clean) treats missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValueStrategy {
    /// Time-aware linear interpolation of numeric columns.
    #[default]
    Interpolate,
    /// Drop every row holding a missing value.
    Drop,
    /// Replace missing values with zero.
    Zero,
}

impl FromStr for MissingValueStrategy {
    type Err = EnergyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interpolate" => Ok(MissingValueStrategy::Interpolate),
            "drop" => Ok(MissingValueStrategy::Drop),
            "zero" => Ok(MissingValueStrategy::Zero),
            _ => Err(EnergyError::Config(format!(
                "Invalid handle_missing method '{}'. Valid methods: interpolate, drop, zero",
                s
            ))),
        }
    }
}

impl fmt::Display for MissingValueStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingValueStrategy::Interpolate => "interpolate",
            MissingValueStrategy::Drop => "drop",
            MissingValueStrategy::Zero => "zero",
        };
        f.write_str(name)
    }
}

/// Parse a timestamp written as RFC 3339, ISO date-time, or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "interpolate".parse::<MissingValueStrategy>().unwrap(),
            MissingValueStrategy::Interpolate
        );
        assert_eq!("DROP".parse::<MissingValueStrategy>().unwrap(), MissingValueStrategy::Drop);
        assert_eq!(" zero ".parse::<MissingValueStrategy>().unwrap(), MissingValueStrategy::Zero);
    }

    #[test]
    fn test_strategy_rejects_unknown() {
        let err = "bogus".parse::<MissingValueStrategy>().unwrap_err();
        assert!(matches!(err, EnergyError::Config(_)));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_strategy_display_round_trips() {
        for s in [
            MissingValueStrategy::Interpolate,
            MissingValueStrategy::Drop,
            MissingValueStrategy::Zero,
        ] {
            assert_eq!(s.to_string().parse::<MissingValueStrategy>().unwrap(), s);
        }
    }

    #[test]
    fn test_load_options_validation() {
        assert!(LoadOptions::default().validate().is_ok());
        assert!(LoadOptions::new("date", "date").validate().is_err());
        assert!(LoadOptions::new("", "quantity").validate().is_err());
        let opts = LoadOptions {
            date_format: Some(String::new()),
            ..LoadOptions::new("date", "quantity")
        };
        assert!(matches!(opts.validate(), Err(EnergyError::Config(_))));
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let a = parse_timestamp("2024-04-01 13:30:00").unwrap();
        assert_eq!(a.hour(), 13);
        let b = parse_timestamp("2024-04-01T13:30").unwrap();
        assert_eq!(a, b);
        let c = parse_timestamp("2024-04-01").unwrap();
        assert_eq!(c.hour(), 0);
        let d = parse_timestamp("2024-04-01T13:30:00+02:00").unwrap();
        assert_eq!(d.hour(), 11);
        assert!(parse_timestamp("01/04/2024").is_none());
    }
}
