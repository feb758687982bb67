//! # Send Persistence
//!
//! The write sequence of a send, in a fixed order:
//!
//! ```text
//!  1. referrer price update        (db write)
//!  2. email dispatch               (bounded by the notify timeout)
//!  3. mark the transaction sent    (conditional db write)
//! ```
//!
//! There is no cross-step rollback. A failure at step 2 leaves the referrer
//! already updated but the transaction unsent, so the operator can retry
//! the send; step 1 recomputes from the base price and is idempotent for
//! staged rates. A failure at step 3 after a delivered email is logged as
//! at-least-once delivery and surfaced to the caller.

use tracing::{debug, warn};

use crate::compute::ComputedSend;
use crate::error::{EngineError, EngineResult};
use crate::notifier::Notifier;
use crate::EngineConfig;
use referral_db::Database;

/// Runs the write sequence for a computed send.
pub async fn persist_send(
    db: &Database,
    notifier: &dyn Notifier,
    config: &EngineConfig,
    referrer_id: &str,
    transaction_id: &str,
    computed: &ComputedSend,
) -> EngineResult<()> {
    db.customers()
        .apply_discount_update(referrer_id, &computed.referrer_update)
        .await?;

    debug!(transaction_id = %transaction_id, to = %computed.email.to, "dispatching notification");

    let delivery = tokio::time::timeout(
        config.notify_timeout,
        notifier.notify_referrer(&computed.email),
    )
    .await;

    match delivery {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            warn!(
                transaction_id = %transaction_id,
                error = %err,
                "notification failed after referrer update; transaction left unsent"
            );
            return Err(EngineError::NotifyFailed(err.to_string()));
        }
        Err(_) => {
            warn!(
                transaction_id = %transaction_id,
                "notification timed out after referrer update; transaction left unsent"
            );
            return Err(EngineError::NotifyTimeout);
        }
    }

    if let Err(err) = db
        .transactions()
        .mark_sent(transaction_id, &computed.transaction_update)
        .await
    {
        warn!(
            transaction_id = %transaction_id,
            error = %err,
            "email delivered but transaction not marked sent; a retry will re-send"
        );
        return Err(err.into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::compute_send;
    use crate::notifier::doubles::{FailingNotifier, HangingNotifier, RecordingNotifier};
    use crate::templates::DefaultTemplates;
    use crate::validate::validate_send;
    use chrono::Utc;
    use referral_core::{Customer, InvoiceStatus, RateInput, ReferralTransaction};
    use referral_db::DbConfig;
    use std::time::Duration;

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
                final_price_cents: 9700,
                discount_rate: 3,
                referral_count: 2,
                total_earnings_cents: 300,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        db.transactions()
            .insert(&ReferralTransaction {
                id: "t1".to_string(),
                referrer_code: "ANNA-1".to_string(),
                new_customer_id: "c2".to_string(),
                discount_rate: 6,
                original_price_cents: Some(9700),
                final_price_cents: Some(9118),
                discount_amount_cents: Some(582),
                referral_level: 2,
                is_bonus: false,
                invoice_status: InvoiceStatus::Pending,
                email_sent: false,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        db
    }

    #[tokio::test]
    async fn test_successful_send_updates_both_rows() {
        let db = seeded_db().await;
        let notifier = RecordingNotifier::default();
        let config = EngineConfig::default();

        let validated = validate_send(&db, "t1", &RateInput::Percent(6)).await.unwrap();
        let computed = compute_send(&validated, &DefaultTemplates, Utc::now());

        persist_send(&db, &notifier, &config, "c1", "t1", &computed)
            .await
            .unwrap();

        let referrer = db.customers().find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(referrer.discount_rate, 6);
        assert_eq!(referrer.final_price_cents, 9118);

        let tx = db.transactions().find_by_id("t1").await.unwrap().unwrap();
        assert!(tx.email_sent);
        assert_eq!(tx.invoice_status, InvoiceStatus::Sent);

        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_notification_leaves_transaction_unsent() {
        let db = seeded_db().await;
        let config = EngineConfig::default();

        let validated = validate_send(&db, "t1", &RateInput::Percent(6)).await.unwrap();
        let computed = compute_send(&validated, &DefaultTemplates, Utc::now());

        let err = persist_send(&db, &FailingNotifier, &config, "c1", "t1", &computed)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotifyFailed(_)));

        // referrer was already updated, transaction stays retryable
        let referrer = db.customers().find_by_id("c1").await.unwrap().unwrap();
        assert_eq!(referrer.final_price_cents, 9118);
        let tx = db.transactions().find_by_id("t1").await.unwrap().unwrap();
        assert!(!tx.email_sent);
        assert_eq!(tx.invoice_status, InvoiceStatus::Pending);
    }

    #[tokio::test]
    async fn test_hanging_notifier_hits_the_timeout() {
        let db = seeded_db().await;
        let config = EngineConfig::default().notify_timeout(Duration::from_millis(20));

        let validated = validate_send(&db, "t1", &RateInput::Percent(6)).await.unwrap();
        let computed = compute_send(&validated, &DefaultTemplates, Utc::now());

        let err = persist_send(&db, &HangingNotifier, &config, "c1", "t1", &computed)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotifyTimeout));

        let tx = db.transactions().find_by_id("t1").await.unwrap().unwrap();
        assert!(!tx.email_sent);
    }
}
