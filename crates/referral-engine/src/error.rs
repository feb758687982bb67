//! # Engine Error Type
//!
//! One error enum for every pipeline. Business refusals from the core
//! policy layer and input validation failures both fold into `Validation`
//! so callers see a single category of "your request was rejected", while
//! storage and notification failures stay distinguishable.

use serde::Serialize;
use thiserror::Error;

use referral_core::{PolicyError, ValidationError};
use referral_db::{DbError, DbErrorCode};

/// Pipeline error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request was rejected before any state changed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Storage failure, already classified by the db layer.
    #[error("storage error: {0}")]
    Repository(#[from] DbError),

    /// The notifier reported a failure.
    #[error("notification failed: {0}")]
    NotifyFailed(String),

    /// The notifier did not answer within the configured timeout.
    #[error("notification timed out")]
    NotifyTimeout,
}

/// Result type for pipeline operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Convenience constructor for missing entities.
    pub fn not_found(entity: &str, id: &str) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Validation(_) => ErrorCode::Validation,
            EngineError::NotFound { .. } => ErrorCode::NotFound,
            EngineError::Repository(db) => match db.code() {
                DbErrorCode::NotFound => ErrorCode::NotFound,
                DbErrorCode::DuplicateKey | DbErrorCode::Validation => ErrorCode::Validation,
                DbErrorCode::Connection | DbErrorCode::Unknown => ErrorCode::Internal,
            },
            EngineError::NotifyFailed(_) | EngineError::NotifyTimeout => ErrorCode::NotifyFailed,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl From<PolicyError> for EngineError {
    fn from(err: PolicyError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

/// Wire-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Validation,
    NotFound,
    NotifyFailed,
    Internal,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_error_folds_into_validation() {
        let err: EngineError = PolicyError::AlreadySent.into();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(err.to_string().contains("already sent"));
    }

    #[test]
    fn test_db_not_found_maps_through() {
        let err: EngineError = DbError::not_found("Customer", "c1").into();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_error_code_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::NotifyFailed).unwrap(),
            "\"NOTIFY_FAILED\""
        );
    }
}
