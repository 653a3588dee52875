use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (divides by n - 1).
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl StatsSummary {
    /// The summary of an empty column: every field is NaN.
    pub fn empty() -> Self {
        StatsSummary {
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        }
    }
}

/// Which periodic profile to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    /// Hour of day, 0..=23.
    Daily,
    /// Day of week, Monday = 0 through Sunday = 6.
    Weekly,
    /// Calendar month, 1..=12.
    Monthly,
}

impl PatternType {
    pub const ALL: [PatternType; 3] = [PatternType::Daily, PatternType::Weekly, PatternType::Monthly];

    /// Capitalized name used in chart titles.
    pub fn title(self) -> &'static str {
        match self {
            PatternType::Daily => "Daily",
            PatternType::Weekly => "Weekly",
            PatternType::Monthly => "Monthly",
        }
    }

    /// Label of the key axis.
    pub fn axis_label(self) -> &'static str {
        match self {
            PatternType::Daily => "Hour of Day",
            PatternType::Weekly => "Day of Week",
            PatternType::Monthly => "Month",
        }
    }

    /// The range every key of this profile falls in.
    pub fn key_domain(self) -> std::ops::RangeInclusive<u32> {
        match self {
            PatternType::Daily => 0..=23,
            PatternType::Weekly => 0..=6,
            PatternType::Monthly => 1..=12,
        }
    }
}

impl FromStr for PatternType {
    type Err = EnergyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "daily_pattern" => Ok(PatternType::Daily),
            "weekly" | "weekly_pattern" => Ok(PatternType::Weekly),
            "monthly" | "monthly_pattern" => Ok(PatternType::Monthly),
            _ => Err(EnergyError::Schema(format!(
                "Pattern type {} not found in patterns",
                s
            ))),
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternType::Daily => "daily",
            PatternType::Weekly => "weekly",
            PatternType::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

/// Average consumption keyed by hour, weekday and month.
///
/// A key is present only if at least one reading maps to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternProfile {
    #[serde(rename = "daily_pattern")]
    pub daily: BTreeMap<u32, f64>,
    #[serde(rename = "weekly_pattern")]
    pub weekly: BTreeMap<u32, f64>,
    #[serde(rename = "monthly_pattern")]
    pub monthly: BTreeMap<u32, f64>,
}

impl PatternProfile {
    pub fn get(&self, pattern: PatternType) -> &BTreeMap<u32, f64> {
        match pattern {
            PatternType::Daily => &self.daily,
            PatternType::Weekly => &self.weekly,
            PatternType::Monthly => &self.monthly,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty() && self.weekly.is_empty() && self.monthly.is_empty()
    }
}
