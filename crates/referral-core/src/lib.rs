//! # referral-core: Pure Business Logic for the Referral Discount Engine
//!
//! This crate is the heart of the system. It contains all business logic as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Referral Discount Engine                            │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                referral-engine (pipelines)                    │  │
//! │  │   Validate ──► Compute ──► PersistNotify   Reset   List       │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │              ★ referral-core (THIS CRATE) ★                   │  │
//! │  │                                                               │  │
//! │  │   ┌─────────┐ ┌──────────┐ ┌────────┐ ┌────────────┐         │  │
//! │  │   │  money  │ │ discount │ │ policy │ │ validation │         │  │
//! │  │   │  Money  │ │ staged   │ │ rules  │ │   input    │         │  │
//! │  │   │  cents  │ │ + bonus  │ │ quotes │ │   checks   │         │  │
//! │  │   └─────────┘ └──────────┘ └────────┘ └────────────┘         │  │
//! │  │                                                               │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │              referral-db (SQLite repositories)                │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`discount`] - Staged and bonus discount price math
//! - [`policy`] - Discount policy decisions and update-payload builders
//! - [`types`] - Domain types (Customer, ReferralTransaction, payloads)
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## The discount model in one paragraph
//!
//! A referrer's 1st, 2nd and 3rd referral each reduce their price by 3%, 6%
//! and 9% respectively, every percentage applied to the *already reduced*
//! price of the previous step and rounded to whole cents. Referrals beyond
//! the third do not stage further; each one is a flat 3% "bonus step"
//! applied to the current final price when the operator sends the bonus
//! notification.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod money;
pub mod policy;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use money::Money;
pub use policy::PolicyError;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of referrals covered by the staged 3%/6%/9% reductions.
///
/// Referrals beyond this count never raise the staged level; they are
/// recorded as bonus transactions and handled through the bonus path.
pub const MAX_STAGED_REFERRALS: i64 = 3;

/// Per-step staged discount rates in basis points, indexed by step (1-based
/// step N uses `STAGED_RATE_BPS[N - 1]`): 3%, 6%, 9%.
pub const STAGED_RATE_BPS: [u32; 3] = [300, 600, 900];

/// Flat rate of a single bonus step, in basis points (3% of the *current*
/// final price, not of the original price).
pub const BONUS_RATE_BPS: u32 = 300;

/// The literal a caller sends to request a bonus step instead of a staged
/// rate: `"+3"`.
pub const BONUS_RATE_SENTINEL: &str = "+3";
