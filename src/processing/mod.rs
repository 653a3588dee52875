//! Loading and cleaning of consumption tables.

pub mod cleaning;

use std::path::Path;

use tracing::debug;

use crate::common::params::{LoadOptions, MissingValueStrategy};
use crate::common::table_reader;
use crate::common::types::ConsumptionTable;
use crate::error::{EnergyError, Result};

/// Loading session for consumption data.
///
/// Holds the most recently loaded table so that [`clean`](Self::clean) can
/// run without an explicit argument. Loading again overwrites it.
///
/// # Example
///
/// ```no_run
/// use meterstats::{DataProcessor, MissingValueStrategy};
///
/// let mut processor = DataProcessor::new();
/// processor.load("energy_data.csv", "date", "quantity")?;
/// let clean = processor.clean(None, MissingValueStrategy::Interpolate)?;
/// # Ok::<(), meterstats::EnergyError>(())
/// ```
#[derive(Debug, Default)]
pub struct DataProcessor {
    current: Option<ConsumptionTable>,
}

impl DataProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file, parse `date_column` as timestamps and check both columns exist.
    pub fn load(
        &mut self,
        path: impl AsRef<Path>,
        date_column: &str,
        consumption_column: &str,
    ) -> Result<&ConsumptionTable> {
        self.load_with(path, &LoadOptions::new(date_column, consumption_column))
    }

    /// Load a file using explicit [`LoadOptions`].
    pub fn load_with(
        &mut self,
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<&ConsumptionTable> {
        let table = table_reader::read_table(path.as_ref(), options)?;
        Ok(&*self.current.insert(table))
    }

    /// The most recently loaded table, if any.
    pub fn current(&self) -> Option<&ConsumptionTable> {
        self.current.as_ref()
    }

    /// Take ownership of the loaded table, leaving the session empty.
    pub fn take_current(&mut self) -> Option<ConsumptionTable> {
        self.current.take()
    }

    /// Handle missing values, then drop fully duplicated rows.
    ///
    /// With `table = None` the session's loaded table is cleaned; the stored
    /// table itself is never modified. Duplicates are detected after filling,
    /// so rows that only become identical through interpolation or zero-fill
    /// are collapsed too.
    pub fn clean(
        &self,
        table: Option<&ConsumptionTable>,
        handle_missing: MissingValueStrategy,
    ) -> Result<ConsumptionTable> {
        let table = match table.or(self.current.as_ref()) {
            Some(t) => t,
            None => return Err(EnergyError::State("No data provided or loaded".into())),
        };

        let filled = match handle_missing {
            MissingValueStrategy::Interpolate => cleaning::interpolate(table),
            MissingValueStrategy::Drop => cleaning::drop_missing(table),
            MissingValueStrategy::Zero => cleaning::fill_zero(table),
        };
        let cleaned = cleaning::drop_duplicates(&filled);

        debug!(
            strategy = %handle_missing,
            input_rows = table.len(),
            output_rows = cleaned.len(),
            "cleaned consumption table"
        );
        Ok(cleaned)
    }

    /// Like [`clean`](Self::clean), with the strategy given by name.
    pub fn clean_named(
        &self,
        table: Option<&ConsumptionTable>,
        handle_missing: &str,
    ) -> Result<ConsumptionTable> {
        let strategy: MissingValueStrategy = handle_missing.parse()?;
        self.clean(table, strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Column;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use proptest::prelude::*;
    use std::io::Write;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn dirty_table() -> ConsumptionTable {
        let dates: Vec<Option<NaiveDateTime>> =
            (0..5).map(|i| Some(base() + Duration::days(i))).collect();
        ConsumptionTable::new(vec![
            Column::timestamp("date", dates),
            Column::float("quantity", vec![Some(10.0), None, Some(30.0), Some(40.0), Some(40.0)]),
        ])
        .unwrap()
        .with_time_index("date")
        .unwrap()
    }

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_stores_current_table() {
        let file = csv_file("date,quantity,organizationName\n2024-04-01,104341,ZDO 15\n");
        let mut processor = DataProcessor::new();
        let loaded = processor.load(file.path(), "date", "quantity").unwrap().clone();
        assert_eq!(loaded.floats("quantity").unwrap(), &[Some(104341.0)]);
        assert_eq!(processor.current(), Some(&loaded));
    }

    #[test]
    fn test_take_current_empties_session() {
        let file = csv_file("date,quantity\n2024-04-01,1\n2024-04-02,2\n");
        let mut processor = DataProcessor::new();
        processor.load(file.path(), "date", "quantity").unwrap();

        let taken = processor.take_current().unwrap();
        assert_eq!(taken.len(), 2);
        assert!(processor.current().is_none());
        assert!(processor.take_current().is_none());
        assert!(matches!(
            processor.clean(None, MissingValueStrategy::Zero),
            Err(EnergyError::State(_))
        ));
    }

    #[test]
    fn test_clean_without_data_is_state_error() {
        let processor = DataProcessor::new();
        let err = processor.clean(None, MissingValueStrategy::Drop).unwrap_err();
        assert!(matches!(err, EnergyError::State(_)));
    }

    #[test]
    fn test_clean_interpolates_then_dedups() {
        let processor = DataProcessor::new();
        let cleaned = processor
            .clean(Some(&dirty_table()), MissingValueStrategy::Interpolate)
            .unwrap();
        // No missing values remain and the interpolated row keeps its place.
        assert_eq!(cleaned.floats("quantity").unwrap()[1], Some(20.0));
        assert_eq!(cleaned.len(), 5);
    }

    #[test]
    fn test_clean_dedups_rows_made_identical_by_fill() {
        let table = ConsumptionTable::new(vec![
            Column::text("meter", vec![Some("m1".into()), Some("m1".into())]),
            Column::float("quantity", vec![Some(0.0), None]),
        ])
        .unwrap();
        let cleaned = DataProcessor::new()
            .clean(Some(&table), MissingValueStrategy::Zero)
            .unwrap();
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn test_clean_drop_strategy() {
        let cleaned = DataProcessor::new()
            .clean(Some(&dirty_table()), MissingValueStrategy::Drop)
            .unwrap();
        assert_eq!(cleaned.len(), 4);
        assert_eq!(cleaned.missing_cells(), 0);
    }

    #[test]
    fn test_bogus_strategy_leaves_current_unchanged() {
        let file = csv_file("date,quantity\n2024-04-01,1\n2024-04-02,\n");
        let mut processor = DataProcessor::new();
        let before = processor.load(file.path(), "date", "quantity").unwrap().clone();

        let err = processor.clean_named(None, "bogus").unwrap_err();
        assert!(matches!(err, EnergyError::Config(_)));
        assert_eq!(processor.current(), Some(&before));
    }

    #[test]
    fn test_clean_uses_current_table() {
        let file = csv_file("date,quantity\n2024-04-01,1\n2024-04-02,\n2024-04-03,3\n");
        let mut processor = DataProcessor::new();
        processor.load(file.path(), "date", "quantity").unwrap();
        let cleaned = processor.clean(None, MissingValueStrategy::Interpolate).unwrap();
        assert_eq!(
            cleaned.floats("quantity").unwrap(),
            &[Some(1.0), Some(2.0), Some(3.0)]
        );
        // Stored table still has its gap.
        assert_eq!(processor.current().unwrap().floats("quantity").unwrap()[1], None);
    }

    proptest! {
        #[test]
        fn prop_clean_is_idempotent_without_missing(
            values in proptest::collection::vec(0u8..4, 0..40),
            strategy in prop_oneof![
                Just(MissingValueStrategy::Interpolate),
                Just(MissingValueStrategy::Drop),
                Just(MissingValueStrategy::Zero),
            ],
        ) {
            let n = values.len();
            let table = ConsumptionTable::new(vec![
                Column::timestamp("date", (0..n).map(|i| Some(base() + Duration::hours((i % 3) as i64))).collect()),
                Column::float("quantity", values.iter().map(|&v| Some(v as f64)).collect()),
            ])
            .unwrap()
            .with_time_index("date")
            .unwrap();

            let processor = DataProcessor::new();
            let once = processor.clean(Some(&table), strategy).unwrap();
            let twice = processor.clean(Some(&once), strategy).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
