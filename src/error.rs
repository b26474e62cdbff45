use thiserror::Error;

/// Error types for the lumifit library.
#[derive(Error, Debug)]
pub enum FitError {
    /// No admissible observations survived screening; the fit cannot proceed.
    #[error("No admissible observations to fit")]
    NoData,

    /// The curvature matrix handed to the linear solver was degenerate,
    /// either rank-deficient or with a zero pivot.
    #[error("Singular matrix encountered")]
    SingularMatrix,

    /// Mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A channel id with no known geometric position.
    #[error("Unknown channel id: {0}")]
    UnknownChannel(u32),

    /// The stepper was driven out of its allowed state order.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for lumifit operations.
pub type Result<T> = std::result::Result<T, FitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FitError::DimensionMismatch("expected 4 parameters, got 3".to_string());
        assert!(format!("{}", err).contains("expected 4 parameters, got 3"));

        let err = FitError::UnknownChannel(9714);
        assert!(format!("{}", err).contains("9714"));
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FitError = io_err.into();

        match err {
            FitError::IoError(_) => (),
            _ => panic!("Expected IoError variant"),
        }
    }
}
