//! Error types for the Caduceus workspace.
//!
//! Only configuration problems are errors. Data-quality degeneracies (missing
//! volatility, empty eligible sets, non-positive momentum) are resolved to flat
//! weights by the signal builders and never surface here.

use thiserror::Error;

/// The main error type for Caduceus operations.
#[derive(Debug, Error)]
pub enum CaduceusError {
    /// Two tables that must share an index or column set do not.
    #[error("Alignment mismatch: {0}")]
    Alignment(String),

    /// A parameter is outside its valid range (zero lookback, non-positive cap, ...).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A mode tag that does not name any known variant.
    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    /// A required column (ticker or feature) is missing.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error due to invalid or malformed input data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Error (de)serializing a run configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl From<String> for CaduceusError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for CaduceusError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl CaduceusError {
    /// Whether this error is a configuration error that must abort the run.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Alignment(_)
                | Self::InvalidParameter(_)
                | Self::UnknownMode(_)
                | Self::MissingColumn(_)
                | Self::Config(_)
        )
    }
}

/// A specialized Result type for Caduceus operations.
pub type Result<T> = std::result::Result<T, CaduceusError>;

/// Return an [`CaduceusError::InvalidParameter`] unless `value` is at least one.
///
/// # Errors
///
/// Fails when `value` is zero.
pub fn ensure_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(CaduceusError::InvalidParameter(format!(
            "{name} must be a positive integer, got 0"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CaduceusError::Alignment("index differs".to_string());
        assert_eq!(err.to_string(), "Alignment mismatch: index differs");

        let err = CaduceusError::MissingColumn("XBI".to_string());
        assert_eq!(err.to_string(), "Missing required column: XBI");
    }

    #[test]
    fn test_error_from_string() {
        let err: CaduceusError = "boom".into();
        assert!(matches!(err, CaduceusError::Other(_)));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_classification() {
        assert!(CaduceusError::UnknownMode("sideways".into()).is_configuration());
        assert!(CaduceusError::InvalidParameter("top_k".into()).is_configuration());
        assert!(!CaduceusError::InvalidData("nan".into()).is_configuration());
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("lookback_months", 6).is_ok());
        let err = ensure_positive("lookback_months", 0).unwrap_err();
        assert!(err.to_string().contains("lookback_months"));
    }
}
