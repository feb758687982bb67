//! # Listing and Deletion
//!
//! Read-side assembly of transaction rows for display, plus transaction
//! deletion with the referrer recompute.
//!
//! ## Bonus-level backfill
//!
//! Stored referral levels cap at 3. A referrer whose code was used five
//! times therefore has five rows whose stored levels top out at 3, and
//! the listing derives the real picture at read time: their newest
//! `referral_count - 3` rows display as bonus steps with effective levels
//! 4, 5, ... and prices recomputed from the base price. Nothing is written
//! back; a listing is always safe to run.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::EngineResult;
use referral_core::{
    discount, Customer, InvoiceStatus, Money, ReferralTransaction, BONUS_RATE_BPS,
    BONUS_RATE_SENTINEL, MAX_STAGED_REFERRALS,
};
use referral_db::Database;

// =============================================================================
// Display Rows
// =============================================================================

/// One transaction as the operator sees it, with derived bonus levels and
/// coerced prices filled in.
#[derive(Debug, Clone)]
pub struct DisplayTransaction {
    pub id: String,
    pub referrer_code: String,
    pub referrer_email: Option<String>,
    pub new_customer_id: String,
    pub new_customer_email: Option<String>,
    pub new_customer_name: Option<String>,
    /// `"3"`, `"6"`, `"9"` or the bonus sentinel.
    pub rate_label: String,
    pub original_price_cents: Option<i64>,
    pub final_price_cents: Option<i64>,
    pub discount_amount_cents: Option<i64>,
    /// Effective level after backfill; may exceed 3 for bonus rows.
    pub referral_level: i64,
    pub is_bonus: bool,
    pub invoice_status: InvoiceStatus,
    pub email_sent: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The assembled listing, split by lifecycle state.
#[derive(Debug, Clone, Default)]
pub struct DiscountListing {
    /// Rows still awaiting their notification, oldest first.
    pub pending: Vec<DisplayTransaction>,
    /// Rows whose notification went out, oldest first.
    pub sent: Vec<DisplayTransaction>,
}

impl DiscountListing {
    pub fn len(&self) -> usize {
        self.pending.len() + self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.sent.is_empty()
    }
}

/// Builds display rows for all transactions, oldest first within each
/// lifecycle bucket. An explicit status leaves the other bucket empty.
///
/// The bonus backfill needs each referrer's complete row set, so the
/// pending/sent split happens after derivation rather than in the query.
pub async fn list_discounts(
    db: &Database,
    status: Option<InvoiceStatus>,
) -> EngineResult<DiscountListing> {
    let transactions = db.transactions().list(None).await?;

    // one referrer lookup per distinct code
    let mut referrers: HashMap<String, Option<Customer>> = HashMap::new();
    for tx in &transactions {
        if !referrers.contains_key(&tx.referrer_code) {
            let referrer = db
                .customers()
                .find_by_referral_code(&tx.referrer_code)
                .await?;
            if referrer.is_none() {
                warn!(code = %tx.referrer_code, "transaction references unknown referrer");
            }
            referrers.insert(tx.referrer_code.clone(), referrer);
        }
    }

    // and one lookup per distinct referred customer
    let mut new_customers: HashMap<String, Option<Customer>> = HashMap::new();
    for tx in &transactions {
        if !new_customers.contains_key(&tx.new_customer_id) {
            let customer = db.customers().find_by_id(&tx.new_customer_id).await?;
            new_customers.insert(tx.new_customer_id.clone(), customer);
        }
    }

    // per code: how many of the newest rows display as bonus steps
    let mut per_code_total: HashMap<&str, i64> = HashMap::new();
    for tx in &transactions {
        *per_code_total.entry(tx.referrer_code.as_str()).or_default() += 1;
    }
    let mut per_code_seen: HashMap<&str, i64> = HashMap::new();

    let mut rows = Vec::with_capacity(transactions.len());
    for tx in &transactions {
        let referrer = referrers.get(&tx.referrer_code).and_then(|r| r.as_ref());
        let new_customer = new_customers.get(&tx.new_customer_id).and_then(|c| c.as_ref());
        let total = per_code_total[tx.referrer_code.as_str()];
        let seen = per_code_seen.entry(tx.referrer_code.as_str()).or_default();
        *seen += 1;
        let position = *seen; // 1-based, oldest first

        let bonus_rows = referrer
            .map(|r| (r.referral_count - MAX_STAGED_REFERRALS).max(0))
            .unwrap_or(0)
            .min(total);

        let row = match referrer {
            Some(_) if position > total - bonus_rows => {
                // this is the (position - (total - bonus_rows))-th bonus step
                let step = position - (total - bonus_rows);
                bonus_row(tx, referrer, new_customer, step)
            }
            // no referrer left to count against: trust the stored flag
            None if tx.is_bonus => bonus_row(tx, None, new_customer, 0),
            _ => staged_row(tx, referrer, new_customer),
        };
        rows.push(row);
    }

    debug!(count = rows.len(), "assembled discount listing");

    let (sent, pending): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|row| row.invoice_status == InvoiceStatus::Sent);

    Ok(match status {
        Some(InvoiceStatus::Pending) => DiscountListing {
            pending,
            sent: Vec::new(),
        },
        Some(InvoiceStatus::Sent) => DiscountListing {
            pending: Vec::new(),
            sent,
        },
        None => DiscountListing { pending, sent },
    })
}

/// A staged row: stored fields, with missing prices coerced.
fn staged_row(
    tx: &ReferralTransaction,
    referrer: Option<&Customer>,
    new_customer: Option<&Customer>,
) -> DisplayTransaction {
    let (original, fin) = coerce_prices(tx, referrer);
    let amount = match (original, fin) {
        (Some(o), Some(f)) => Some((o - f).clamp_non_negative().cents()),
        _ => tx.discount_amount_cents,
    };

    DisplayTransaction {
        id: tx.id.clone(),
        referrer_code: tx.referrer_code.clone(),
        referrer_email: referrer.map(|r| r.email.clone()),
        new_customer_id: tx.new_customer_id.clone(),
        new_customer_email: new_customer.map(|c| c.email.clone()),
        new_customer_name: new_customer.and_then(|c| c.name.clone()),
        rate_label: if tx.is_bonus {
            BONUS_RATE_SENTINEL.to_string()
        } else {
            tx.discount_rate.to_string()
        },
        original_price_cents: original.map(|m| m.cents()),
        final_price_cents: fin.map(|m| m.cents()),
        discount_amount_cents: tx.discount_amount_cents.or(amount),
        referral_level: tx.referral_level,
        is_bonus: tx.is_bonus,
        invoice_status: tx.invoice_status,
        email_sent: tx.email_sent,
        created_at: tx.created_at,
    }
}

/// A derived bonus row: the `step`-th referral past the staged cap, with
/// prices recomputed from the referrer's base price.
fn bonus_row(
    tx: &ReferralTransaction,
    referrer: Option<&Customer>,
    new_customer: Option<&Customer>,
    step: i64,
) -> DisplayTransaction {
    let (level, original, fin) = match referrer {
        Some(referrer) => {
            // oldest selected row advances the stored level by one, the
            // next by two, clamped at the referral count
            let level = (tx.referral_level + step).min(referrer.referral_count);
            let base = referrer.base_price();
            (
                level,
                Some(discount::price_at_level(base, level - 1)),
                Some(discount::price_at_level(base, level)),
            )
        }
        None => {
            // no referrer to recompute from: one bonus step off the stored
            // after-price, stored level as-is
            match tx.final_price() {
                Some(stored) => {
                    let amount = stored.percent_of(BONUS_RATE_BPS);
                    (tx.referral_level, Some(stored), Some(stored - amount))
                }
                None => (tx.referral_level, None, None),
            }
        }
    };

    let amount = match (original, fin) {
        (Some(o), Some(f)) => Some((o - f).clamp_non_negative().cents()),
        _ => None,
    };

    DisplayTransaction {
        id: tx.id.clone(),
        referrer_code: tx.referrer_code.clone(),
        referrer_email: referrer.map(|r| r.email.clone()),
        new_customer_id: tx.new_customer_id.clone(),
        new_customer_email: new_customer.map(|c| c.email.clone()),
        new_customer_name: new_customer.and_then(|c| c.name.clone()),
        rate_label: BONUS_RATE_SENTINEL.to_string(),
        original_price_cents: original.map(|m| m.cents()),
        final_price_cents: fin.map(|m| m.cents()),
        discount_amount_cents: amount,
        referral_level: level,
        is_bonus: true,
        invoice_status: tx.invoice_status,
        email_sent: tx.email_sent,
        created_at: tx.created_at,
    }
}

/// Fills missing step prices from whatever is available: the stored
/// counterpart price and the row's own rate first, the referrer's staged
/// curve second.
fn coerce_prices(
    tx: &ReferralTransaction,
    referrer: Option<&Customer>,
) -> (Option<Money>, Option<Money>) {
    let rate_bps = (tx.discount_rate.clamp(0, 100) * 100) as u32;

    let original = tx.original_price().or_else(|| {
        tx.final_price()
            .filter(|_| rate_bps > 0)
            .map(|f| f.before_percent(rate_bps))
            .or_else(|| {
                referrer.map(|r| discount::price_at_level(r.base_price(), tx.referral_level - 1))
            })
    });

    let fin = tx.final_price().or_else(|| {
        original
            .filter(|_| rate_bps > 0)
            .map(|o| o.less_percent(rate_bps))
    });

    (original, fin)
}

// =============================================================================
// Deletion
// =============================================================================

/// What a completed deletion changed.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub transaction_id: String,
    /// Present when the referrer still exists and was recomputed.
    pub referrer_id: Option<String>,
    pub referral_count: i64,
    pub reference_cleared: bool,
}

/// Deletes a transaction and recomputes the referrer's cached discount
/// from scratch.
///
/// The recompute replays the whole curve from the base price at the new
/// count, so deleting any transaction (not just the newest) leaves the
/// cached fields exactly as if the deleted referral had never happened.
/// The referred customer's back-link is cleared as part of the same
/// operation.
pub async fn delete_transaction(db: &Database, transaction_id: &str) -> EngineResult<DeleteOutcome> {
    referral_core::validation::validate_transaction_id(transaction_id)?;

    let transaction = db
        .transactions()
        .find_by_id(transaction_id)
        .await?
        .ok_or_else(|| crate::EngineError::not_found("Transaction", transaction_id))?;

    db.transactions().delete(transaction_id).await?;

    let reference_cleared = db
        .customers()
        .clear_reference(
            &transaction.new_customer_id,
            &transaction.referrer_code,
            chrono::Utc::now(),
        )
        .await?;

    let referrer = db
        .customers()
        .find_by_referral_code(&transaction.referrer_code)
        .await?;

    let Some(referrer) = referrer else {
        warn!(
            code = %transaction.referrer_code,
            "deleted transaction had no referrer to recompute"
        );
        return Ok(DeleteOutcome {
            transaction_id: transaction_id.to_string(),
            referrer_id: None,
            referral_count: 0,
            reference_cleared,
        });
    };

    let count = db
        .transactions()
        .count_for_code(&transaction.referrer_code)
        .await?;
    let base = referrer.base_price();
    let discount_rate = (count * 3).min(9).max(0);
    let final_price = discount::price_at_level(base, count);
    let earnings = discount::total_earnings(base, count);

    db.customers()
        .apply_recompute(
            &referrer.id,
            count,
            discount_rate,
            final_price.cents(),
            earnings.cents(),
            chrono::Utc::now(),
        )
        .await?;

    debug!(
        transaction_id = %transaction_id,
        referrer = %referrer.referral_code,
        referral_count = count,
        final_price_cents = final_price.cents(),
        "referrer recomputed after deletion"
    );

    Ok(DeleteOutcome {
        transaction_id: transaction_id.to_string(),
        referrer_id: Some(referrer.id),
        referral_count: count,
        reference_cleared,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
