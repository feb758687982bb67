//! # Discount Policy
//!
//! Pure decision functions for the discount pipelines: which rates are
//! acceptable, who qualifies for a bonus step, whether a notification may
//! be sent, and what exactly should change in storage when it is.
//!
//! Every function returns a typed result. Expected business conditions
//! (wrong rate, not eligible, already sent) are [`PolicyError`] values and
//! never panics; callers convert them to validation failures at the
//! use-case boundary.
//!
//! ## Quote flow
//! ```text
//! validate_rate ──► ResolvedRate
//!                        │
//!        ┌───────────────┴───────────────┐
//!        ▼                               ▼
//!  standard_quote                   bonus_quote
//!  (recompute from base price       (one flat 3% step off the
//!   and current referral count)      *cached* final price)
//!        │                               │
//!        └───────────────┬───────────────┘
//!                        ▼
//!         referrer_update / transaction_update
//!              (plain data, no I/O)
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::discount;
use crate::money::Money;
use crate::types::{
    Customer, RateInput, ReferralTransaction, ReferrerUpdate, ResolvedRate, TransactionUpdate,
};
use crate::{BONUS_RATE_BPS, BONUS_RATE_SENTINEL, MAX_STAGED_REFERRALS};

// =============================================================================
// Policy Error
// =============================================================================

/// Business-rule refusals. Structured so callers can give precise feedback
/// without parsing message text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    /// The requested rate is not 3, 6, 9 or the bonus sentinel.
    #[error("discount rate must be 3, 6 or 9, or \"{BONUS_RATE_SENTINEL}\" for a bonus step (got {given})")]
    InvalidRate { given: String },

    /// Bonus steps require the staged levels to be exhausted first.
    #[error("bonus discount requires at least {required} referrals, customer has {referral_count}")]
    BonusNotEligible { referral_count: i64, required: i64 },

    /// The discount email for this transaction has already gone out.
    #[error("discount email was already sent for this transaction")]
    AlreadySent,
}

/// Result type for policy decisions.
pub type PolicyResult<T> = Result<T, PolicyError>;

// =============================================================================
// Decision Functions
// =============================================================================

/// Accepts exactly the numbers 3, 6, 9 or the literal bonus sentinel.
///
/// ## Example
/// ```rust
/// use referral_core::policy::validate_rate;
/// use referral_core::types::RateInput;
///
/// assert!(validate_rate(&RateInput::Percent(6)).is_ok());
/// assert!(validate_rate(&RateInput::Sentinel("+3".into())).unwrap().is_bonus);
/// assert!(validate_rate(&RateInput::Percent(5)).is_err());
/// ```
pub fn validate_rate(input: &RateInput) -> PolicyResult<ResolvedRate> {
    match input {
        RateInput::Percent(p @ (3 | 6 | 9)) => Ok(ResolvedRate {
            percent: *p,
            is_bonus: false,
        }),
        RateInput::Sentinel(s) if s == BONUS_RATE_SENTINEL => Ok(ResolvedRate {
            percent: (BONUS_RATE_BPS / 100) as i64,
            is_bonus: true,
        }),
        RateInput::Percent(other) => Err(PolicyError::InvalidRate {
            given: other.to_string(),
        }),
        RateInput::Sentinel(other) => Err(PolicyError::InvalidRate {
            given: other.clone(),
        }),
    }
}

/// A referrer qualifies for a bonus step only once all three staged levels
/// are used up. The failure carries both the actual count and the required
/// threshold so the caller can echo them back.
pub fn check_bonus_eligibility(referral_count: i64) -> PolicyResult<()> {
    if referral_count >= MAX_STAGED_REFERRALS {
        Ok(())
    } else {
        Err(PolicyError::BonusNotEligible {
            referral_count,
            required: MAX_STAGED_REFERRALS,
        })
    }
}

/// A notification may only go out while `email_sent` is still false.
pub fn check_email_status(email_sent: bool) -> PolicyResult<()> {
    if email_sent {
        Err(PolicyError::AlreadySent)
    } else {
        Ok(())
    }
}

// =============================================================================
// Quotes
// =============================================================================

/// The worked arithmetic of one discount step, ready for email rendering
/// and payload construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountQuote {
    /// Price before this step.
    pub previous_price: Money,
    /// Price after this step.
    pub new_price: Money,
    /// `previous_price - new_price`.
    pub discount_amount: Money,
    /// Whole-percent rate of this step.
    pub rate_percent: i64,
}

/// Quote for a staged send: the new final price is recomputed from the
/// referrer's base price and *current* referral count, and the discount
/// amount is the delta from the price one staged step earlier.
///
/// `rate_percent` is reported as requested; for referrers already past the
/// staged cap the recomputation caps too, so the delta collapses to zero.
pub fn standard_quote(referrer: &Customer, rate_percent: i64) -> DiscountQuote {
    let base = referrer.base_price();
    let new_price = discount::discounted_price(base, referrer.referral_count);
    let previous_price = discount::discounted_price(base, referrer.referral_count - 1);

    DiscountQuote {
        previous_price,
        new_price,
        discount_amount: previous_price - new_price,
        rate_percent,
    }
}

/// Quote for a bonus send: exactly one flat 3% reduction applied to the
/// referrer's *current cached* final price (not recomputed from the base
/// price), rounded to whole cents so drift cannot compound over many bonus
/// levels.
pub fn bonus_quote(referrer: &Customer) -> DiscountQuote {
    let previous_price = referrer.final_price();
    let discount_amount = previous_price.percent_of(BONUS_RATE_BPS);

    DiscountQuote {
        previous_price,
        new_price: previous_price - discount_amount,
        discount_amount,
        rate_percent: (BONUS_RATE_BPS / 100) as i64,
    }
}

/// Builds the quote matching a resolved rate.
pub fn quote_for(referrer: &Customer, rate: &ResolvedRate) -> DiscountQuote {
    if rate.is_bonus {
        bonus_quote(referrer)
    } else {
        standard_quote(referrer, rate.percent)
    }
}

// =============================================================================
// Update Builders
// =============================================================================

/// Pending referrer change for a send.
///
/// A staged send installs the requested rate; a bonus send reduces the
/// cached price but leaves the cached rate where the staged levels left it.
pub fn referrer_update(
    referrer: &Customer,
    rate: &ResolvedRate,
    quote: &DiscountQuote,
    now: DateTime<Utc>,
) -> ReferrerUpdate {
    ReferrerUpdate {
        discount_rate: if rate.is_bonus {
            referrer.discount_rate
        } else {
            rate.percent
        },
        final_price_cents: quote.new_price.cents(),
        updated_at: now,
    }
}

/// Pending transaction change for a send.
///
/// For a bonus send the stored level advances by one step, clamped so it
/// never exceeds the referrer's current referral count, and the concrete
/// step prices are snapshotted onto the transaction. Staged sends keep the
/// creation-time snapshot.
pub fn transaction_update(
    transaction: &ReferralTransaction,
    referrer: &Customer,
    rate: &ResolvedRate,
    quote: &DiscountQuote,
    now: DateTime<Utc>,
) -> TransactionUpdate {
    let referral_level = if rate.is_bonus {
        (transaction.referral_level + 1).min(referrer.referral_count)
    } else {
        transaction.referral_level
    };

    let (original, fin, amount) = if rate.is_bonus {
        (
            Some(quote.previous_price.cents()),
            Some(quote.new_price.cents()),
            Some(quote.discount_amount.cents()),
        )
    } else {
        (None, None, None)
    };

    TransactionUpdate {
        discount_rate: rate.percent,
        is_bonus: rate.is_bonus,
        referral_level,
        original_price_cents: original,
        final_price_cents: fin,
        discount_amount_cents: amount,
        updated_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
