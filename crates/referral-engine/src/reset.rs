//! # Reset Pipeline
//!
//! Moves a sent transaction back to pending so its notification can be
//! redone, and tells the referrer the earlier email was sent in error.
//!
//! The state transition is the authoritative part and happens first; the
//! correction email is best-effort afterwards. A reset whose correction
//! could not be delivered still counts as a reset.

use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::notifier::{EmailMessage, Notifier};
use crate::templates::{CorrectionEmail, EmailTemplates};
use crate::EngineConfig;
use referral_core::{validation, Customer, Money, ReferralTransaction};
use referral_db::Database;

/// What a completed reset looked like.
#[derive(Debug, Clone)]
pub struct ResetOutcome {
    pub transaction_id: String,
    pub referrer_email: String,
    /// The step discount the correction email withdraws.
    pub reversed_amount: Money,
    pub correction_sent: bool,
}

/// The discount amount the original notification announced.
///
/// Prefers the stored step amount, then the difference of the stored step
/// prices. Rows missing the before-price derive it by inverting the step
/// rate on the after-price, and the result is clamped so a corrupt row can
/// never produce a negative correction.
fn reversed_amount(tx: &ReferralTransaction) -> Money {
    if let Some(amount) = tx.discount_amount_cents {
        return Money::from_cents(amount).clamp_non_negative();
    }

    let rate_bps = (tx.discount_rate * 100) as u32;
    let final_price = tx.final_price();
    let original = tx.original_price().or_else(|| {
        final_price.map(|f| f.before_percent(rate_bps))
    });

    match (original, final_price) {
        (Some(original), Some(final_price)) => (original - final_price).clamp_non_negative(),
        _ => Money::zero(),
    }
}

/// Resets a sent transaction and, unless suppressed, dispatches the
/// correction email.
pub async fn reset_discount(
    db: &Database,
    notifier: &dyn Notifier,
    templates: &dyn EmailTemplates,
    config: &EngineConfig,
    transaction_id: &str,
    send_correction: bool,
    now: chrono::DateTime<chrono::Utc>,
) -> EngineResult<ResetOutcome> {
    validation::validate_transaction_id(transaction_id)?;

    let transaction = db
        .transactions()
        .find_by_id(transaction_id)
        .await?
        .ok_or_else(|| EngineError::not_found("Transaction", transaction_id))?;

    if !transaction.email_sent {
        return Err(EngineError::Validation(
            "transaction email was never sent, nothing to reset".to_string(),
        ));
    }

    let referrer: Customer = db
        .customers()
        .find_by_referral_code(&transaction.referrer_code)
        .await?
        .ok_or_else(|| EngineError::not_found("Referrer", &transaction.referrer_code))?;

    db.transactions().reset_sent(transaction_id, now).await?;

    debug!(transaction_id = %transaction_id, "transaction reset to pending");

    let reversed = reversed_amount(&transaction);

    if !send_correction {
        return Ok(ResetOutcome {
            transaction_id: transaction_id.to_string(),
            referrer_email: referrer.email,
            reversed_amount: reversed,
            correction_sent: false,
        });
    }

    let content = templates.correction(&CorrectionEmail {
        referrer_name: referrer.name.as_deref(),
        rate_percent: transaction.discount_rate,
        reversed_amount: reversed,
    });
    let message = EmailMessage {
        to: referrer.email.clone(),
        subject: content.subject,
        body: content.body,
    };

    let correction_sent = match tokio::time::timeout(
        config.notify_timeout,
        notifier.notify_correction(&message),
    )
    .await
    {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(
                transaction_id = %transaction_id,
                error = %err,
                "correction email failed; transaction already reset"
            );
            false
        }
        Err(_) => {
            warn!(
                transaction_id = %transaction_id,
                "correction email timed out; transaction already reset"
            );
            false
        }
    };

    Ok(ResetOutcome {
        transaction_id: transaction_id.to_string(),
        referrer_email: referrer.email,
        reversed_amount: reversed,
        correction_sent,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::doubles::{FailingNotifier, RecordingNotifier};
    use crate::templates::DefaultTemplates;
    use chrono::Utc;
    use referral_core::{InvoiceStatus, TransactionUpdate};
    use referral_db::DbConfig;

    fn tx(id: &str, sent: bool) -> ReferralTransaction {
        let now = Utc::now();
        ReferralTransaction {
            id: id.to_string(),
            referrer_code: "ANNA-1".to_string(),
            new_customer_id: "c2".to_string(),
            discount_rate: 6,
            original_price_cents: Some(9700),
            final_price_cents: Some(9118),
            discount_amount_cents: Some(582),
            referral_level: 2,
            is_bonus: false,
            invoice_status: if sent { InvoiceStatus::Sent } else { InvoiceStatus::Pending },
            email_sent: sent,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seeded_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        db.customers()
            .insert(&Customer {
                id: "c1".to_string(),
                email: "anna@example.com".to_string(),
                name: Some("Anna".to_string()),
                referral_code: "ANNA-1".to_string(),
                reference: None,
                base_price_cents: 10000,
                final_price_cents: 9118,
                discount_rate: 6,
                referral_count: 2,
                total_earnings_cents: 882,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        db
    }

    async fn mark_sent(db: &Database, id: &str) {
        db.transactions()
            .mark_sent(
                id,
                &TransactionUpdate {
                    discount_rate: 6,
                    is_bonus: false,
                    referral_level: 2,
                    original_price_cents: None,
                    final_price_cents: None,
                    discount_amount_cents: None,
                    updated_at: Utc::now(),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_returns_transaction_to_pending() {
        let db = seeded_db().await;
        db.transactions().insert(&tx("t1", false)).await.unwrap();
        mark_sent(&db, "t1").await;

        let notifier = RecordingNotifier::default();
        let outcome = reset_discount(
            &db,
            &notifier,
            &DefaultTemplates,
            &EngineConfig::default(),
            "t1",
            true,
            Utc::now(),
        )
        .await
        .unwrap();

        assert!(outcome.correction_sent);
        assert_eq!(outcome.reversed_amount.cents(), 582);
        assert_eq!(outcome.referrer_email, "anna@example.com");

        let reloaded = db.transactions().find_by_id("t1").await.unwrap().unwrap();
        assert!(!reloaded.email_sent);
        assert_eq!(reloaded.invoice_status, InvoiceStatus::Pending);

        let corrections = notifier.corrections.lock().unwrap();
        assert_eq!(corrections.len(), 1);
        assert!(corrections[0].body.contains("5.82"));
    }

    #[tokio::test]
    async fn test_reset_refuses_unsent_transaction() {
        let db = seeded_db().await;
        db.transactions().insert(&tx("t1", false)).await.unwrap();

        let err = reset_discount(
            &db,
            &RecordingNotifier::default(),
            &DefaultTemplates,
            &EngineConfig::default(),
            "t1",
            true,
            Utc::now(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failed_correction_does_not_undo_the_reset() {
        let db = seeded_db().await;
        db.transactions().insert(&tx("t1", false)).await.unwrap();
        mark_sent(&db, "t1").await;

        let outcome = reset_discount(
            &db,
            &FailingNotifier,
            &DefaultTemplates,
            &EngineConfig::default(),
            "t1",
            true,
            Utc::now(),
        )
        .await
        .unwrap();

        assert!(!outcome.correction_sent);
        let reloaded = db.transactions().find_by_id("t1").await.unwrap().unwrap();
        assert!(!reloaded.email_sent);
    }

    #[tokio::test]
    async fn test_correction_can_be_suppressed() {
        let db = seeded_db().await;
        db.transactions().insert(&tx("t1", false)).await.unwrap();
        mark_sent(&db, "t1").await;

        let notifier = RecordingNotifier::default();
        let outcome = reset_discount(
            &db,
            &notifier,
            &DefaultTemplates,
            &EngineConfig::default(),
            "t1",
            false,
            Utc::now(),
        )
        .await
        .unwrap();

        assert!(!outcome.correction_sent);
        assert!(notifier.corrections.lock().unwrap().is_empty());
        let reloaded = db.transactions().find_by_id("t1").await.unwrap().unwrap();
        assert!(!reloaded.email_sent);
    }

    #[test]
    fn test_reversed_amount_derivation() {
        // stored amount wins
        assert_eq!(reversed_amount(&tx("t", true)).cents(), 582);

        // missing amount: difference of the step prices
        let mut t = tx("t", true);
        t.discount_amount_cents = None;
        assert_eq!(reversed_amount(&t).cents(), 582);

        // missing before-price: invert the 6% step on the after-price
        t.original_price_cents = None;
        assert_eq!(reversed_amount(&t).cents(), 582);

        // nothing stored at all: zero, never negative
        t.final_price_cents = None;
        assert_eq!(reversed_amount(&t).cents(), 0);
    }
}
