//! Error taxonomy for the prediction pipeline
//!
//! All variants are recoverable at the request boundary; none of them is
//! allowed to take the host process down.

use serde_json::Value;
use thiserror::Error;

/// A raw input field could not be coerced to its numeric type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid value for `{field}`: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_numeric(field: &str, value: &Value) -> Self {
        let reason = match value {
            Value::Null => "value is missing".to_string(),
            Value::String(s) if s.trim().is_empty() => "value is empty".to_string(),
            other => format!("{} is not a number of the expected type", other),
        };
        Self::new(field, reason)
    }
}

/// Persistence failures. Owned by the store, propagated unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("stored record {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Every way a prediction request can fail
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("prediction model unavailable: {cause}")]
    ModelUnavailable { cause: String },

    #[error("student profile not found for `{username}`")]
    ProfileNotFound { username: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PredictionError {
    pub fn model_unavailable(cause: impl Into<String>) -> Self {
        PredictionError::ModelUnavailable { cause: cause.into() }
    }

    /// Short machine-readable kind, used in batch reports and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::Validation(_) => "validation_error",
            PredictionError::ModelUnavailable { .. } => "model_unavailable",
            PredictionError::ProfileNotFound { .. } => "profile_not_found",
            PredictionError::Store(_) => "store_error",
        }
    }
}

pub type PredictionResult<T> = Result<T, PredictionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_message_names_field() {
        let err = ValidationError::not_numeric("gpa", &json!(""));
        assert_eq!(err.to_string(), "invalid value for `gpa`: value is empty");

        let err = ValidationError::not_numeric("repeat_count", &Value::Null);
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_store_error_passes_through_unchanged() {
        let store = StoreError::Backend("connection reset".to_string());
        let err: PredictionError = store.clone().into();
        assert_eq!(err, PredictionError::Store(store));
        assert_eq!(err.to_string(), "store backend error: connection reset");
        assert_eq!(err.kind(), "store_error");
    }
}
