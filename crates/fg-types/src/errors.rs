use thiserror::Error;

/// Main error type for the fstat-grid system
#[derive(Error, Debug)]
pub enum FgError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors from result files, grid files and numeric formats
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Cannot parse output format '{fmt}' to obtain a tolerance")]
    MalformedFormat { fmt: String },

    #[error("Got 0-length grid from file: {path}")]
    EmptyGrid { path: String },

    #[error("Parse error in {path} at line {line}: {message}")]
    ParseError {
        path: String,
        line: usize,
        message: String,
    },

    #[error("Column not found: {column}")]
    MissingColumn { column: String },

    #[error("Row length mismatch: expected {expected} columns, got {actual}")]
    RowLengthMismatch { expected: usize, actual: usize },
}

/// Errors from search setup and execution
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Please choose only one of [{first},{second}]")]
    IncompatibleStatistics { first: String, second: String },

    #[error("Search requires the '{name}' axis to be specified")]
    MissingAxis { name: String },

    #[error("Evaluator failed: {message}")]
    EvaluatorFailed { message: String },

    #[error("Could not get value for declared output column '{column}' from candidate point")]
    SchemaMismatch { column: String },

    #[error("Exclusive device '{name}' is already held; release the previous lease first")]
    DeviceBusy { name: String },
}

/// Result type alias for fstat-grid operations
pub type FgResult<T> = Result<T, FgError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::FgError::Config(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::FgError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SearchError::IncompatibleStatistics {
            first: "BSGL".to_string(),
            second: "BtSG".to_string(),
        };
        assert!(error.to_string().contains("BSGL"));
        assert!(error.to_string().contains("BtSG"));
    }

    #[test]
    fn test_error_conversion() {
        let data_error = DataError::EmptyGrid {
            path: "grid.txt".to_string(),
        };
        let fg_error: FgError = data_error.into();
        match fg_error {
            FgError::Data(_) => (),
            _ => panic!("Expected Data error"),
        }
    }

    #[test]
    fn test_macros() {
        let _config_err = config_error!("Missing required field: {}", "label");
        let _internal_err = internal_error!("Something went wrong");
    }
}
