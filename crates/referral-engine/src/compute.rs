//! # Send Computation
//!
//! Turns a validated send into the three things the persist step needs:
//! the rendered email, the referrer's pending price change and the
//! transaction's pending lifecycle change. Pure assembly over the core
//! quote and update builders; no I/O and no clock access beyond the
//! timestamp the caller passes in.

use chrono::{DateTime, Utc};

use crate::notifier::EmailMessage;
use crate::templates::{BonusEmail, EmailTemplates, StandardEmail};
use crate::validate::ValidatedSend;
use referral_core::{policy, policy::DiscountQuote, ReferrerUpdate, TransactionUpdate};

/// Everything the persist step writes and sends, computed up front.
#[derive(Debug, Clone)]
pub struct ComputedSend {
    pub email: EmailMessage,
    /// The step arithmetic behind the payloads, kept for result reporting.
    pub quote: DiscountQuote,
    pub referrer_update: ReferrerUpdate,
    pub transaction_update: TransactionUpdate,
}

/// Assembles the email and update payloads for a validated send.
pub fn compute_send(
    validated: &ValidatedSend,
    templates: &dyn EmailTemplates,
    now: DateTime<Utc>,
) -> ComputedSend {
    let ValidatedSend {
        transaction,
        referrer,
        rate,
    } = validated;

    let quote = policy::quote_for(referrer, rate);
    let referrer_update = policy::referrer_update(referrer, rate, &quote, now);
    let transaction_update = policy::transaction_update(transaction, referrer, rate, &quote, now);

    let content = if rate.is_bonus {
        templates.bonus(&BonusEmail {
            referrer_name: referrer.name.as_deref(),
            referral_count: referrer.referral_count,
            previous_price: quote.previous_price,
            new_price: quote.new_price,
            discount_amount: quote.discount_amount,
        })
    } else {
        templates.standard(&StandardEmail {
            referrer_name: referrer.name.as_deref(),
            rate_percent: quote.rate_percent,
            referral_level: transaction.referral_level,
            previous_price: quote.previous_price,
            new_price: quote.new_price,
            discount_amount: quote.discount_amount,
        })
    };

    ComputedSend {
        email: EmailMessage {
            to: referrer.email.clone(),
            subject: content.subject,
            body: content.body,
        },
        quote,
        referrer_update,
        transaction_update,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
