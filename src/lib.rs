//! Load, clean, analyze, forecast and chart energy-meter consumption data.
//!
//! The pipeline runs through four independent components:
//!
//! - [`DataProcessor`] reads CSV or Parquet files through an embedded DuckDB
//!   connection and cleans the resulting [`ConsumptionTable`].
//! - [`EnergyAnalyzer`] computes summary statistics and hourly, weekly and
//!   monthly usage profiles.
//! - [`EnergyForecaster`] splits tables chronologically and forecasts series
//!   with an additive Holt-Winters model.
//! - [`EnergyVisualizer`] renders trend, pattern and forecast charts to SVG.
//!
//! ```no_run
//! use meterstats::{
//!     DataProcessor, EnergyAnalyzer, EnergyForecaster, EnergyVisualizer, FigureSize,
//!     ForecastMethod, MissingValueStrategy, PatternType,
//! };
//!
//! let mut processor = DataProcessor::new();
//! processor.load("energy_data.csv", "date", "quantity")?;
//! let table = processor.clean(None, MissingValueStrategy::Interpolate)?;
//!
//! let stats = EnergyAnalyzer::new().basic_stats(&table, "quantity")?;
//! let profile = EnergyAnalyzer::new().detect_patterns(&table, "quantity", "date")?;
//! println!("mean consumption {:.1}", stats.mean);
//!
//! let series = table.series("date", "quantity")?;
//! let forecast = EnergyForecaster::new().forecast(&series, 24, ForecastMethod::HoltWinters, Some(24))?;
//!
//! let visualizer = EnergyVisualizer::new();
//! visualizer
//!     .plot_pattern(&profile, PatternType::Daily, FigureSize::pattern())?
//!     .save("daily.svg")?;
//! visualizer
//!     .plot_forecast(&series, &forecast, FigureSize::trend())?
//!     .save("forecast.svg")?;
//! # Ok::<(), meterstats::EnergyError>(())
//! ```
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod analysis;
pub mod common;
pub mod error;
pub mod forecast;
pub mod processing;
pub mod seasonality;
pub mod visualize;

pub use analysis::{EnergyAnalyzer, PatternProfile, PatternType, StatsSummary};
pub use common::grouping::{partition_by, GroupedTable};
pub use common::params::{LoadOptions, MissingValueStrategy};
pub use common::types::{Column, ColumnData, ConsumptionTable, SeriesIndex, TimeSeries};
pub use error::{EnergyError, Result};
pub use forecast::models::HoltWintersFit;
pub use forecast::params::{ForecastMethod, ForecastParams};
pub use forecast::{EnergyForecaster, ForecastAccuracy, ForecastSeries};
pub use processing::DataProcessor;
pub use visualize::{EnergyVisualizer, Figure, FigureSize};
