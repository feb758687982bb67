//! # Database Error Types
//!
//! Storage errors, classified once at this crate's boundary.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  SQLite error (sqlx::Error)                                         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  DbError (this module) ← classified via sqlx's typed ErrorKind,     │
//! │       │                  never by matching message text             │
//! │       ▼                                                             │
//! │  DbErrorCode ← stable machine-readable code downstream code         │
//! │                switches on (DUPLICATE_KEY, NOT_FOUND, ...)          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Downstream callers query [`DbError::code`] and never inspect the
//! human-readable message programmatically.

use serde::Serialize;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found, or a conditional update matched no row (e.g. the
    /// transaction was already marked sent by a concurrent pipeline).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation (duplicate email or referral code).
    #[error("duplicate key: {constraint}")]
    Duplicate { constraint: String },

    /// Constraint violation other than uniqueness (CHECK, NOT NULL,
    /// foreign key).
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Database connection failed or the pool is gone.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Anything sqlx reports that fits none of the above.
    #[error("internal database error: {0}")]
    Internal(String),
}

/// Stable classification of storage failures.
///
/// This is the only thing call sites are allowed to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DbErrorCode {
    DuplicateKey,
    NotFound,
    Validation,
    Connection,
    Unknown,
}

impl DbError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the stable classification of this error.
    pub fn code(&self) -> DbErrorCode {
        match self {
            DbError::NotFound { .. } => DbErrorCode::NotFound,
            DbError::Duplicate { .. } => DbErrorCode::DuplicateKey,
            DbError::Constraint(_) => DbErrorCode::Validation,
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => DbErrorCode::Connection,
            DbError::MigrationFailed(_) | DbError::QueryFailed(_) | DbError::Internal(_) => {
                DbErrorCode::Unknown
            }
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Classification Mapping
/// ```text
/// sqlx::Error::RowNotFound              → NotFound
/// sqlx::Error::Database + UniqueViolation   → Duplicate
/// sqlx::Error::Database + other violations  → Constraint
/// sqlx::Error::PoolTimedOut             → PoolExhausted
/// sqlx::Error::PoolClosed / Io / Tls    → ConnectionFailed
/// everything else                       → Internal
/// ```
///
/// Uses `DatabaseError::kind()` rather than inspecting SQLite's message
/// strings, so the classification survives backend message changes.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                use sqlx::error::ErrorKind;

                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::Duplicate {
                        constraint: db_err
                            .constraint()
                            .unwrap_or("unique constraint")
                            .to_string(),
                    },
                    ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation => DbError::Constraint(db_err.message().to_string()),
                    _ => DbError::QueryFailed(db_err.message().to_string()),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),

            sqlx::Error::Tls(e) => DbError::ConnectionFailed(e.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================
