//! # Domain Types
//!
//! Core domain types of the referral discount engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────────┐        ┌────────────────────────┐           │
//! │  │     Customer      │        │  ReferralTransaction   │           │
//! │  │  ───────────────  │ 1    n │  ────────────────────  │           │
//! │  │  id (UUID)        │◄───────│  referrer_code         │           │
//! │  │  referral_code    │        │  new_customer_id       │           │
//! │  │  base_price_cents │        │  referral_level (≤3)   │           │
//! │  │  final_price_cents│        │  invoice_status        │           │
//! │  │  referral_count   │        │  email_sent / is_bonus │           │
//! │  └───────────────────┘        └────────────────────────┘           │
//! │                                                                     │
//! │  ┌───────────────────┐        ┌────────────────────────┐           │
//! │  │   InvoiceStatus   │        │       RateInput        │           │
//! │  │  Pending | Sent   │        │  3 | 6 | 9 | "+3"      │           │
//! │  └───────────────────┘        └────────────────────────┘           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Customer` row plays two roles: the registering customer (whose
//! `reference` field remembers which referral code they used) and, once
//! their own code has been used, the referrer whose cached price fields the
//! send pipeline maintains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Invoice Status
// =============================================================================

/// Notification lifecycle position of a referral transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Created, discount email not yet sent.
    Pending,
    /// Discount email sent (may be reset back to Pending).
    Sent,
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Pending
    }
}

// =============================================================================
// Rate Input
// =============================================================================

/// A caller-supplied discount rate, exactly as it appears on the wire:
/// the number `3`, `6` or `9`, or the bonus sentinel string `"+3"`.
///
/// Deserialization is intentionally permissive; [`crate::policy::validate_rate`]
/// decides whether the value is acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RateInput {
    Percent(i64),
    Sentinel(String),
}

/// A rate that has passed policy validation.
///
/// `percent` is always one of 3, 6 or 9; for a bonus request it is the
/// flat 3% of the bonus step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRate {
    pub percent: i64,
    pub is_bonus: bool,
}

// =============================================================================
// Customer (Referrer)
// =============================================================================

/// A customer record; the referrer side of every transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Unique email address; the destination of discount notifications.
    pub email: String,

    /// Optional display name for email salutations.
    pub name: Option<String>,

    /// Unique referral code handed out to this customer.
    pub referral_code: String,

    /// Referral code of the referrer *this* customer registered with, if
    /// any. Cleared when the corresponding transaction is deleted.
    pub reference: Option<String>,

    /// Price at first registration, in cents. Never changes; every
    /// recomputation starts from here.
    pub base_price_cents: i64,

    /// Cached current discounted price in cents.
    pub final_price_cents: i64,

    /// Cached current percentage: 0, 3, 6 or 9.
    pub discount_rate: i64,

    /// Number of times this customer's code has been used. Never below zero.
    pub referral_count: i64,

    /// Cumulative staged discount total in cents (reporting value).
    pub total_earnings_cents: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Original price as Money.
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }

    /// Cached current price as Money.
    #[inline]
    pub fn final_price(&self) -> Money {
        Money::from_cents(self.final_price_cents)
    }
}

// =============================================================================
// Referral Transaction
// =============================================================================

/// One immutable record of a single referral-code usage event.
///
/// Core fields are frozen at creation. The lifecycle fields
/// (`invoice_status`, `email_sent`, `is_bonus`) and the send-time price
/// snapshot are the only parts this system updates afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReferralTransaction {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Referral code that was used (the referrer's code).
    pub referrer_code: String,

    /// The customer who registered using the code.
    pub new_customer_id: String,

    /// Percent applied to the *referrer* at this step: 3, 6 or 9.
    pub discount_rate: i64,

    /// Referrer's price before this step, in cents. Nullable: legacy rows
    /// may miss price snapshots; the read path derives a fallback.
    pub original_price_cents: Option<i64>,

    /// Referrer's price after this step, in cents.
    pub final_price_cents: Option<i64>,

    /// Concrete discount of this step in cents; always set on bonus sends.
    pub discount_amount_cents: Option<i64>,

    /// 1-based ordinal of this referral for the referrer, capped at 3 at
    /// creation time. Display code derives higher effective levels for
    /// bonus rows without touching this field.
    pub referral_level: i64,

    /// True when this transaction represents a 4th+ referral handled via
    /// the bonus path.
    pub is_bonus: bool,

    pub invoice_status: InvoiceStatus,

    /// Set at most once per successful send; reset is the only way back.
    pub email_sent: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferralTransaction {
    #[inline]
    pub fn original_price(&self) -> Option<Money> {
        self.original_price_cents.map(Money::from_cents)
    }

    #[inline]
    pub fn final_price(&self) -> Option<Money> {
        self.final_price_cents.map(Money::from_cents)
    }
}

// =============================================================================
// Update Payloads
// =============================================================================
// Plain data produced by the policy layer and applied by the repositories.
// No I/O happens anywhere near their construction.

/// Pending change to a referrer's cached price fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferrerUpdate {
    pub discount_rate: i64,
    pub final_price_cents: i64,
    pub updated_at: DateTime<Utc>,
}

/// Pending change marking a transaction as sent.
///
/// The price snapshot fields are `Some` only for bonus sends; staged sends
/// keep the creation-time snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUpdate {
    pub discount_rate: i64,
    pub is_bonus: bool,
    pub referral_level: i64,
    pub original_price_cents: Option<i64>,
    pub final_price_cents: Option<i64>,
    pub discount_amount_cents: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Email Content
// =============================================================================

/// Rendered notification content, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
