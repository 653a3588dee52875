//! Table types, load options and the DuckDB-backed reader shared by the components.

pub mod grouping;
pub mod params;
pub mod table_reader;
pub mod types;
