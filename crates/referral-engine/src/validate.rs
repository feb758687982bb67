//! # Send Preconditions
//!
//! The ordered gates a send request must pass before anything is computed
//! or written. Each gate is a hard stop; the first failure is returned and
//! no state has changed at that point.
//!
//! ```text
//!  1. transaction id is well-formed
//!  2. rate is 3, 6, 9 or the bonus sentinel
//!  3. transaction exists
//!  4. its email was not already sent
//!  5. the referrer behind the code exists and has a usable email
//!  6. bonus requests: referrer has exhausted the staged levels
//! ```

use tracing::debug;

use crate::error::{EngineError, EngineResult};
use referral_core::{policy, validation, Customer, RateInput, ReferralTransaction, ResolvedRate};
use referral_db::Database;

/// A send request that has passed every gate.
#[derive(Debug, Clone)]
pub struct ValidatedSend {
    pub transaction: ReferralTransaction,
    pub referrer: Customer,
    pub rate: ResolvedRate,
}

/// Runs the gates in order against current storage state.
pub async fn validate_send(
    db: &Database,
    transaction_id: &str,
    rate: &RateInput,
) -> EngineResult<ValidatedSend> {
    validation::validate_transaction_id(transaction_id)?;
    let rate = policy::validate_rate(rate)?;

    let transaction = db
        .transactions()
        .find_by_id(transaction_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Transaction", transaction_id))?;

    policy::check_email_status(transaction.email_sent)?;

    let referrer = db
        .customers()
        .find_by_referral_code(&transaction.referrer_code)
        .await?
        .ok_or_else(|| EngineError::not_found("Referrer", &transaction.referrer_code))?;

    validation::validate_email(&referrer.email)?;

    if rate.is_bonus {
        policy::check_bonus_eligibility(referrer.referral_count)?;
    }

    debug!(
        transaction_id = %transaction.id,
        referrer = %referrer.referral_code,
        rate = rate.percent,
        is_bonus = rate.is_bonus,
        "send request validated"
    );

    Ok(ValidatedSend {
        transaction,
        referrer,
        rate,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
