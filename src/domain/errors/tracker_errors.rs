use thiserror::Error;

use super::ValidationError;

/// Errors raised by services and the storage layer
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Product with code '{code}' not found")]
    ProductNotFound { code: String },

    #[error("Release with code '{code}' not found")]
    ReleaseNotFound { code: String },

    #[error("Feature with code '{code}' not found")]
    FeatureNotFound { code: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Duplicate business code rejected by the storage uniqueness constraint
    #[error("{entity} with code '{code}' already exists")]
    Conflict { entity: &'static str, code: String },

    #[error("Write attempted in a read-only transaction")]
    ReadOnlyTransaction,

    #[error("Transaction already completed")]
    TransactionClosed,

    #[error("Event publication failed: {message}")]
    EventPublication { message: String },

    #[error("Infrastructure error: {message}")]
    Infrastructure {
        message: String,
        detail: Option<String>,
    },
}

impl TrackerError {
    pub fn infrastructure(message: impl Into<String>) -> Self {
        TrackerError::Infrastructure {
            message: message.into(),
            detail: None,
        }
    }
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TrackerError::ReleaseNotFound {
            code: "IDEA-2023.3.8".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Release with code 'IDEA-2023.3.8' not found"
        );

        let err = TrackerError::Conflict {
            entity: "Feature",
            code: "F1".to_string(),
        };
        assert_eq!(err.to_string(), "Feature with code 'F1' already exists");
    }

    #[test]
    fn test_validation_conversion() {
        let err: TrackerError = ValidationError::EmptyCode.into();
        assert!(matches!(err, TrackerError::Validation(ValidationError::EmptyCode)));
    }
}
