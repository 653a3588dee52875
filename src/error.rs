use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, EnergyError>;

/// Errors raised by the loader, analyzer, forecaster and visualizer.
///
/// Every operation either fully succeeds or returns one of these; nothing is
/// retried or swallowed internally.
#[derive(Error, Debug)]
pub enum EnergyError {
    /// The input file could not be read, parsed, or cast.
    #[error("Error loading data: {0}")]
    Load(String),

    /// An expected column is absent or has the wrong type.
    #[error("Schema error: {0}")]
    Schema(String),

    /// An option value is out of range or unknown.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The operation needs state that was never established.
    #[error("Invalid state: {0}")]
    State(String),

    /// The requested forecasting method is not implemented.
    #[error("Unsupported forecasting method: {0}")]
    UnsupportedMethod(String),

    /// The forecasting model could not be fitted to the series.
    #[error("Model fitting failed: {0}")]
    Fit(String),

    /// The chart could not be drawn or written.
    #[error("Rendering failed: {0}")]
    Render(String),
}

impl From<duckdb::Error> for EnergyError {
    fn from(e: duckdb::Error) -> Self {
        EnergyError::Load(e.to_string())
    }
}
