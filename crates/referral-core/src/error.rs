//! # Error Types
//!
//! Input-validation errors for referral-core.
//!
//! ## Where errors live
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  referral-core                                                      │
//! │  ├── ValidationError  (this file)  - malformed input, field-level   │
//! │  └── PolicyError      (policy.rs)  - business-rule refusals         │
//! │                                                                     │
//! │  referral-db                                                        │
//! │  └── DbError          - storage failures, classified once           │
//! │                                                                     │
//! │  referral-engine                                                    │
//! │  └── EngineError      - use-case boundary; policy and validation    │
//! │                         failures surface as Validation there        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Input validation errors.
///
/// Raised before any business logic runs. Errors are enum variants with the
/// offending field attached, never bare strings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., not an email address).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;
