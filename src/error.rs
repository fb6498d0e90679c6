//! Error types for the provider fraud pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, FraudError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum FraudError {
    /// One or more required columns are missing
    #[error("Schema error in {table}: {}", .failures.join("; "))]
    SchemaError { table: String, failures: Vec<String> },

    /// Key uniqueness, null keys, negative amounts, bad category codes
    #[error("Data quality error in {table}: {}", .failures.join("; "))]
    DataQualityError { table: String, failures: Vec<String> },

    /// Rows left without a counterpart after a join that must be total
    #[error("Join integrity error in {join}: {unmatched} unmatched rows (sample: {})", .sample.join(", "))]
    JoinIntegrityError {
        join: String,
        unmatched: usize,
        sample: Vec<String>,
    },

    #[error("Numeric error: {0}")]
    NumericError(String),

    #[error("Tuning trial {trial} failed: {reason}")]
    TuningTrialError { trial: usize, reason: String },

    #[error("Model persistence error: {0}")]
    ModelPersistenceError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    /// A pipeline stage aborted the run
    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: Box<FraudError>,
    },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl FraudError {
    /// Build an invalid-parameter error
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        FraudError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error belongs to the fail-fast input checks
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self.root_cause(),
            FraudError::SchemaError { .. } | FraudError::DataQualityError { .. }
        )
    }

    /// The underlying error with any stage wrapping removed
    pub fn root_cause(&self) -> &FraudError {
        match self {
            FraudError::StageFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<polars::error::PolarsError> for FraudError {
    fn from(err: polars::error::PolarsError) -> Self {
        FraudError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for FraudError {
    fn from(err: serde_json::Error) -> Self {
        FraudError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for FraudError {
    fn from(err: bincode::Error) -> Self {
        FraudError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FraudError {
    fn from(err: ndarray::ShapeError) -> Self {
        FraudError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FraudError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_schema_error_lists_every_failure() {
        let err = FraudError::SchemaError {
            table: "inpatient".to_string(),
            failures: vec![
                "Missing column: ClaimID".to_string(),
                "Missing column: Provider".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("ClaimID"));
        assert!(msg.contains("Provider"));
        assert!(err.is_validation_failure());
    }

    #[test]
    fn test_join_integrity_display() {
        let err = FraudError::JoinIntegrityError {
            join: "claims-beneficiary".to_string(),
            unmatched: 2,
            sample: vec!["CLM1".to_string(), "CLM2".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Join integrity error in claims-beneficiary: 2 unmatched rows (sample: CLM1, CLM2)"
        );
        assert!(!err.is_validation_failure());
    }

    #[test]
    fn test_stage_wrapping_keeps_root_cause() {
        let err = FraudError::StageFailed {
            stage: "validate".to_string(),
            source: Box::new(FraudError::DataQualityError {
                table: "labels".to_string(),
                failures: vec!["Provider unique: 1/2".to_string()],
            }),
        };
        assert!(err.to_string().starts_with("Stage 'validate' failed"));
        assert!(err.is_validation_failure());
        assert!(matches!(err.root_cause(), FraudError::DataQualityError { .. }));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FraudError = io_err.into();
        assert!(matches!(err, FraudError::IoError(_)));
    }
}
