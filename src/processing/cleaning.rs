use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::common::types::{ColumnData, ConsumptionTable};

/// Fill gaps in every numeric column by linear interpolation.
///
/// The x-axis is the table's time index when it has one. A gap whose target
/// or bounding timestamps are missing falls back to row positions. Interior
/// gaps are interpolated, trailing gaps repeat the last valid value and
/// leading gaps are left missing.
pub fn interpolate(table: &ConsumptionTable) -> ConsumptionTable {
    let axis: Option<Vec<Option<NaiveDateTime>>> = table
        .time_index()
        .and_then(|name| table.timestamps(name).ok())
        .map(|ts| ts.to_vec());

    let mut out = table.clone();
    for column in out.columns_mut() {
        if let ColumnData::Float(values) = &mut column.data {
            interpolate_values(values, axis.as_deref());
        }
    }
    out
}

/// Interpolate one column in place.
fn interpolate_values(values: &mut [Option<f64>], axis: Option<&[Option<NaiveDateTime>]>) {
    let mut last_valid: Option<usize> = None;
    let mut i = 0;
    while i < values.len() {
        if values[i].is_some() {
            last_valid = Some(i);
            i += 1;
            continue;
        }

        let gap_end = (i..values.len()).find(|&j| values[j].is_some());
        match (last_valid, gap_end) {
            (Some(lo), Some(hi)) => {
                let (y0, y1) = (values[lo].unwrap_or_default(), values[hi].unwrap_or_default());
                for k in i..hi {
                    let t = position(axis, lo, hi, k);
                    values[k] = Some(y0 + (y1 - y0) * t);
                }
                i = hi;
            }
            (Some(lo), None) => {
                let fill = values[lo];
                for v in values[i..].iter_mut() {
                    *v = fill;
                }
                break;
            }
            (None, Some(hi)) => i = hi,
            (None, None) => break,
        }
    }
}

/// Fraction of the way from row `lo` to row `hi` at which row `k` sits.
fn position(axis: Option<&[Option<NaiveDateTime>]>, lo: usize, hi: usize, k: usize) -> f64 {
    let by_time = axis.and_then(|ts| {
        let (t0, t1, tk) = (ts[lo]?, ts[hi]?, ts[k]?);
        let span = (t1 - t0).num_milliseconds() as f64;
        if span <= 0.0 {
            return None;
        }
        Some((tk - t0).num_milliseconds() as f64 / span)
    });
    by_time.unwrap_or_else(|| (k - lo) as f64 / (hi - lo) as f64)
}

/// Keep only the rows without any missing cell.
pub fn drop_missing(table: &ConsumptionTable) -> ConsumptionTable {
    let keep: Vec<usize> = (0..table.len())
        .filter(|&row| !table.row_has_missing(row))
        .collect();
    table.select_rows(&keep)
}

/// Replace missing cells with zero: 0.0, `"0"`, or the Unix epoch.
pub fn fill_zero(table: &ConsumptionTable) -> ConsumptionTable {
    let epoch = DateTime::<Utc>::UNIX_EPOCH.naive_utc();
    let mut out = table.clone();
    for column in out.columns_mut() {
        match &mut column.data {
            ColumnData::Float(v) => v.iter_mut().for_each(|x| *x = Some(x.unwrap_or(0.0))),
            ColumnData::Text(v) => v
                .iter_mut()
                .filter(|x| x.is_none())
                .for_each(|x| *x = Some("0".to_string())),
            ColumnData::Timestamp(v) => v.iter_mut().for_each(|x| *x = Some(x.unwrap_or(epoch))),
        }
    }
    out
}

/// Remove rows identical to an earlier row across all columns.
///
/// The first occurrence survives and the survivors keep their relative order.
pub fn drop_duplicates(table: &ConsumptionTable) -> ConsumptionTable {
    let mut seen = HashSet::with_capacity(table.len());
    let keep: Vec<usize> = (0..table.len())
        .filter(|&row| seen.insert(table.row(row)))
        .collect();
    table.select_rows(&keep)
}
