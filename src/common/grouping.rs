use std::collections::BTreeMap;

use super::types::{ColumnData, ConsumptionTable};
use crate::error::{EnergyError, Result};

/// The rows of a table sharing one value of a grouping column.
///
/// For example, grouping meter readings by `organizationID` yields one
/// `GroupedTable` per organization, each with the full column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedTable {
    /// The grouping column's value for these rows, rendered as text.
    pub group_key: String,
    /// The rows themselves, in their original relative order.
    pub table: ConsumptionTable,
}

/// Arithmetic mean of the values falling under each key.
///
/// Keys without any value never appear in the output.
pub fn group_means<K, I>(pairs: I) -> BTreeMap<K, f64>
where
    K: Ord,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut sums: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for (key, value) in pairs {
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(key, (sum, count))| (key, sum / count as f64))
        .collect()
}

/// Split a table into one sub-table per distinct value of `column`.
///
/// Groups come back ordered by key; rows with a missing key are left out.
pub fn partition_by(table: &ConsumptionTable, column: &str) -> Result<Vec<GroupedTable>> {
    let keys: Vec<Option<String>> = match &table.column(column)?.data {
        ColumnData::Text(v) => v.clone(),
        ColumnData::Float(v) => v.iter().map(|x| x.map(|x| x.to_string())).collect(),
        ColumnData::Timestamp(_) => {
            return Err(EnergyError::Schema(format!(
                "cannot group by timestamp column '{}'",
                column
            )))
        }
    };

    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (row, key) in keys.into_iter().enumerate() {
        if let Some(key) = key {
            groups.entry(key).or_default().push(row);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(group_key, rows)| GroupedTable {
            group_key,
            table: table.select_rows(&rows),
        })
        .collect())
}
