use std::path::Path;

use chrono::DateTime;
use duckdb::Connection;
use tracing::{debug, info};

use super::params::LoadOptions;
use super::types::{Column, ColumnData, ConsumptionTable};
use crate::error::{EnergyError, Result};

/// Staging table the raw file is materialized into before casting.
const STAGING_TABLE: &str = "source_rows";

/// How a source column is carried into the in-memory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Timestamp,
    Float,
    Text,
}

/// Read a consumption table from a delimited text or Parquet file.
///
/// The file is materialized into an in-memory DuckDB table (letting DuckDB
/// sniff delimiters, headers and column types), the required columns are
/// checked, and then every column is cast into its in-memory representation:
/// the date column to TIMESTAMP, the consumption column to DOUBLE, other
/// numeric columns to DOUBLE, other temporal columns to TIMESTAMP and the rest
/// to VARCHAR. Rows keep their file order.
pub fn read_table(path: &Path, options: &LoadOptions) -> Result<ConsumptionTable> {
    options.validate()?;

    let path_str = path
        .to_str()
        .ok_or_else(|| EnergyError::Load(format!("path {:?} is not valid UTF-8", path)))?;
    if !path.is_file() {
        return Err(EnergyError::Load(format!("file '{}' does not exist", path_str)));
    }

    let con = Connection::open_in_memory()?;
    let source = source_expr(path_str, options);
    debug!(%source, "materializing source file");
    con.execute_batch(&format!(
        "CREATE TABLE \"{}\" AS SELECT * FROM {}",
        STAGING_TABLE, source
    ))?;

    let schema = describe(&con)?;
    for required in [&options.date_column, &options.consumption_column] {
        if !schema.iter().any(|(name, _)| name == required) {
            return Err(EnergyError::Schema(format!(
                "Required columns {} and {} not found",
                options.date_column, options.consumption_column
            )));
        }
    }

    let plan: Vec<(String, ColumnKind, String)> = schema
        .into_iter()
        .map(|(name, data_type)| {
            let kind = if name == options.date_column {
                ColumnKind::Timestamp
            } else if name == options.consumption_column {
                ColumnKind::Float
            } else {
                classify(&data_type)
            };
            let expr = cast_expr(&name, kind, options);
            (name, kind, expr)
        })
        .collect();

    let select: Vec<&str> = plan.iter().map(|(_, _, expr)| expr.as_str()).collect();
    let sql = format!(
        "SELECT {} FROM \"{}\" ORDER BY rowid",
        select.join(", "),
        STAGING_TABLE
    );

    let mut buffers: Vec<ColumnData> = plan
        .iter()
        .map(|(_, kind, _)| match kind {
            ColumnKind::Timestamp => ColumnData::Timestamp(Vec::new()),
            ColumnKind::Float => ColumnData::Float(Vec::new()),
            ColumnKind::Text => ColumnData::Text(Vec::new()),
        })
        .collect();

    let mut stmt = con.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (i, buffer) in buffers.iter_mut().enumerate() {
            match buffer {
                ColumnData::Timestamp(v) => {
                    let millis: Option<i64> = row.get(i)?;
                    v.push(
                        millis
                            .and_then(DateTime::from_timestamp_millis)
                            .map(|dt| dt.naive_utc()),
                    );
                }
                ColumnData::Float(v) => v.push(row.get::<_, Option<f64>>(i)?),
                ColumnData::Text(v) => v.push(row.get::<_, Option<String>>(i)?),
            }
        }
    }

    let columns: Vec<Column> = plan
        .into_iter()
        .zip(buffers)
        .map(|((name, _, _), data)| Column { name, data })
        .collect();

    let table = ConsumptionTable::new(columns)?.with_time_index(&options.date_column)?;
    info!(
        path = path_str,
        rows = table.len(),
        columns = table.columns().len(),
        "loaded consumption table"
    );
    Ok(table)
}

/// The DuckDB table function that reads `path`.
fn source_expr(path: &str, options: &LoadOptions) -> String {
    let literal = quote_literal(path);
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".parquet") || lower.ends_with(".pq") {
        return format!("read_parquet({})", literal);
    }

    let mut args = vec![literal];
    if let Some(delimiter) = options.delimiter {
        args.push(format!("delim = {}", quote_literal(&delimiter.to_string())));
    }
    if let Some(header) = options.has_header {
        args.push(format!("header = {}", header));
    }
    if options.date_format.is_some() {
        // Keep the raw text so strptime sees it unaltered by the sniffer.
        args.push(format!(
            "types = {{{}: 'VARCHAR'}}",
            quote_literal(&options.date_column)
        ));
    }
    format!("read_csv_auto({})", args.join(", "))
}

/// Column names and DuckDB type names of the staging table, in file order.
fn describe(con: &Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = con.prepare(
        "SELECT column_name, data_type FROM information_schema.columns \
         WHERE table_name = ? ORDER BY ordinal_position",
    )?;
    let columns = stmt
        .query_map([STAGING_TABLE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Map a DuckDB type name onto the in-memory column kind.
fn classify(data_type: &str) -> ColumnKind {
    const NUMERIC: [&str; 12] = [
        "TINYINT", "SMALLINT", "INTEGER", "BIGINT", "HUGEINT", "UTINYINT", "USMALLINT",
        "UINTEGER", "UBIGINT", "UHUGEINT", "FLOAT", "DOUBLE",
    ];
    let upper = data_type.to_ascii_uppercase();
    if NUMERIC.contains(&upper.as_str()) || upper.starts_with("DECIMAL") {
        ColumnKind::Float
    } else if upper == "DATE" || upper.starts_with("TIMESTAMP") {
        ColumnKind::Timestamp
    } else {
        ColumnKind::Text
    }
}

/// SQL expression producing the column in the shape the reader expects.
///
/// Timestamps travel as epoch milliseconds so no driver-side date decoding is needed.
fn cast_expr(name: &str, kind: ColumnKind, options: &LoadOptions) -> String {
    let ident = format!("\"{}\"", escape_identifier(name));
    match kind {
        ColumnKind::Timestamp => match (&options.date_format, name == options.date_column) {
            (Some(format), true) => format!(
                "epoch_ms(strptime(CAST({} AS VARCHAR), {}))",
                ident,
                quote_literal(format)
            ),
            _ => format!("epoch_ms(CAST({} AS TIMESTAMP))", ident),
        },
        ColumnKind::Float => format!("CAST({} AS DOUBLE)", ident),
        ColumnKind::Text => format!("CAST({} AS VARCHAR)", ident),
    }
}

/// Escape a SQL identifier by doubling any internal double quotes.
fn escape_identifier(name: &str) -> String {
    name.replace('"', "\"\"")
}

/// Render a string as a single-quoted SQL literal.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_table_types_and_order() {
        let file = csv_file(
            "id,date,organizationName,quantity\n\
             3,2024-04-01 10:00:00,ZDO 15,104341\n\
             1,2024-04-01 11:00:00,ZDO 47,\n\
             2,2024-04-01 12:00:00,ZDO 11,28971.64\n",
        );
        let table = read_table(file.path(), &LoadOptions::new("date", "quantity")).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.column_names(),
            vec!["id", "date", "organizationName", "quantity"]
        );
        assert_eq!(table.time_index(), Some("date"));
        assert_eq!(
            table.floats("quantity").unwrap(),
            &[Some(104341.0), None, Some(28971.64)]
        );
        assert_eq!(table.floats("id").unwrap(), &[Some(3.0), Some(1.0), Some(2.0)]);

        let dates = table.timestamps("date").unwrap();
        assert_eq!(dates[0].unwrap().hour(), 10);
        assert_eq!(dates[2].unwrap().hour(), 12);

        match &table.column("organizationName").unwrap().data {
            ColumnData::Text(v) => assert_eq!(v[0].as_deref(), Some("ZDO 15")),
            other => panic!("expected text column, got {}", other.kind()),
        }
    }

    #[test]
    fn test_read_table_missing_required_column() {
        let file = csv_file("date,amount\n2024-04-01,1\n");
        let err = read_table(file.path(), &LoadOptions::new("date", "quantity")).unwrap_err();
        assert!(matches!(err, EnergyError::Schema(_)), "got {:?}", err);
    }

    #[test]
    fn test_read_table_unparseable_date() {
        let file = csv_file("date,quantity\nnot a date,1\nstill not,2\n");
        let err = read_table(file.path(), &LoadOptions::new("date", "quantity")).unwrap_err();
        assert!(matches!(err, EnergyError::Load(_)), "got {:?}", err);
    }

    #[test]
    fn test_read_table_non_numeric_consumption() {
        let file = csv_file("date,quantity\n2024-04-01,lots\n2024-04-02,few\n");
        let err = read_table(file.path(), &LoadOptions::new("date", "quantity")).unwrap_err();
        assert!(matches!(err, EnergyError::Load(_)), "got {:?}", err);
    }

    #[test]
    fn test_read_table_nonexistent_file() {
        let err = read_table(
            Path::new("/definitely/not/here.csv"),
            &LoadOptions::new("date", "quantity"),
        )
        .unwrap_err();
        assert!(matches!(err, EnergyError::Load(_)));
    }

    #[test]
    fn test_read_table_with_date_format_and_delimiter() {
        let file = csv_file("date;quantity\n01.04.2024 08:00;5\n02.04.2024 09:30;6\n");
        let options = LoadOptions {
            date_format: Some("%d.%m.%Y %H:%M".to_string()),
            delimiter: Some(';'),
            ..LoadOptions::new("date", "quantity")
        };
        let table = read_table(file.path(), &options).unwrap();
        let dates = table.timestamps("date").unwrap();
        assert_eq!(
            dates[1],
            NaiveDate::from_ymd_opt(2024, 4, 2).unwrap().and_hms_opt(9, 30, 0)
        );
        assert_eq!(table.floats("quantity").unwrap(), &[Some(5.0), Some(6.0)]);
    }

    #[test]
    fn test_read_table_headerless_csv() {
        let file = csv_file("2024-04-01 10:00:00,5\n2024-04-01 11:00:00,6\n");
        let options = LoadOptions {
            has_header: Some(false),
            ..LoadOptions::new("column0", "column1")
        };
        let table = read_table(file.path(), &options).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_names(), vec!["column0", "column1"]);
        assert_eq!(table.floats("column1").unwrap(), &[Some(5.0), Some(6.0)]);
        assert_eq!(table.timestamps("column0").unwrap()[1].unwrap().hour(), 11);
    }

    #[test]
    fn test_read_table_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.parquet");
        let con = Connection::open_in_memory().unwrap();
        con.execute_batch(&format!(
            "COPY (SELECT * FROM (VALUES \
               (TIMESTAMP '2024-04-01 10:00:00', 5.5, 'ZDO 15'), \
               (TIMESTAMP '2024-04-01 11:00:00', 6.5, 'ZDO 47')) \
             AS t(date, quantity, org)) TO {} (FORMAT PARQUET)",
            quote_literal(path.to_str().unwrap())
        ))
        .unwrap();

        let table = read_table(&path, &LoadOptions::new("date", "quantity")).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.time_index(), Some("date"));
        assert_eq!(table.floats("quantity").unwrap(), &[Some(5.5), Some(6.5)]);
        assert_eq!(table.timestamps("date").unwrap()[0].unwrap().hour(), 10);
        match &table.column("org").unwrap().data {
            ColumnData::Text(v) => assert_eq!(v[1].as_deref(), Some("ZDO 47")),
            other => panic!("expected text column, got {}", other.kind()),
        }
    }

    #[test]
    fn test_classify_types() {
        assert_eq!(classify("BIGINT"), ColumnKind::Float);
        assert_eq!(classify("DECIMAL(18,3)"), ColumnKind::Float);
        assert_eq!(classify("DATE"), ColumnKind::Timestamp);
        assert_eq!(classify("TIMESTAMP WITH TIME ZONE"), ColumnKind::Timestamp);
        assert_eq!(classify("VARCHAR"), ColumnKind::Text);
        assert_eq!(classify("BOOLEAN"), ColumnKind::Text);
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_identifier("a\"b"), "a\"\"b");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
