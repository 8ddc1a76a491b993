//! Error types for morphoseg

use thiserror::Error;

/// Main error type for morphoseg operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Two rasters that must share an extent do not
    #[error("Raster size mismatch in {stage}: expected ({er}, {ec}), got ({ar}, {ac})")]
    DimensionMismatch {
        stage: &'static str,
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    /// A pipeline was run before its source raster was attached
    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Configuration error, detected before any computation starts
    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::DimensionMismatch`] from two `(rows, cols)` shapes
    pub fn mismatch(stage: &'static str, expected: (usize, usize), actual: (usize, usize)) -> Self {
        Error::DimensionMismatch {
            stage,
            er: expected.0,
            ec: expected.1,
            ar: actual.0,
            ac: actual.1,
        }
    }
}

/// Result type alias for morphoseg operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message() {
        let err = Error::mismatch("classifier", (4, 5), (4, 6));
        assert_eq!(
            err.to_string(),
            "Raster size mismatch in classifier: expected (4, 5), got (4, 6)"
        );
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = Error::InvalidParameter {
            name: "profile_size",
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert!(err.to_string().contains("profile_size = 0"));
    }
}
