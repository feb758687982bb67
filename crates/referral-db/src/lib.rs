//! # referral-db: Database Layer for the Referral Discount Engine
//!
//! SQLite storage with sqlx. This crate owns the connection pool, the
//! embedded migrations, the two repositories (customers, referral
//! transactions) and the single point where storage errors are classified.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  referral-engine pipeline                                           │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                referral-db (THIS CRATE)                       │  │
//! │  │                                                               │  │
//! │  │   ┌────────────┐   ┌─────────────────┐   ┌────────────────┐  │  │
//! │  │   │  Database  │   │  Repositories   │   │   Migrations   │  │  │
//! │  │   │ (pool.rs)  │◄──│ customers       │   │   (embedded)   │  │  │
//! │  │   │ SqlitePool │   │ transactions    │   │  001_init.sql  │  │  │
//! │  │   └────────────┘   └─────────────────┘   └────────────────┘  │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (WAL mode)                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use referral_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("referrals.db")).await?;
//! let referrer = db.customers().find_by_referral_code("ANNA-1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbErrorCode, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::customer::CustomerRepository;
pub use repository::transaction::TransactionRepository;
