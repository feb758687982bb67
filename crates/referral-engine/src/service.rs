//! # Discount Engine Facade
//!
//! [`DiscountEngine`] owns the wired-together dependencies (storage,
//! notifier, templates, config) and exposes one method per use case with
//! wire-shaped request/response types. Everything behind it is in the
//! pipeline modules; this file is construction and mapping.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::compute::compute_send;
use crate::error::{EngineError, EngineResult};
use crate::list::{self, DisplayTransaction};
use crate::notifier::{LogNotifier, Notifier};
use crate::persist::persist_send;
use crate::reset::reset_discount;
use crate::templates::{DefaultTemplates, EmailTemplates};
use crate::validate::validate_send;
use crate::EngineConfig;
use referral_core::{
    discount, validation, Customer, InvoiceStatus, RateInput, ReferralTransaction,
    MAX_STAGED_REFERRALS,
};
use referral_db::Database;

// =============================================================================
// Requests and Responses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDiscountRequest {
    pub transaction_id: String,
    pub discount_rate: RateInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDiscountResult {
    pub transaction_id: String,
    pub email_sent: bool,
    pub referrer_email: String,
    pub rate_percent: i64,
    pub is_bonus: bool,
    pub previous_price_cents: i64,
    pub new_price_cents: i64,
    pub discount_amount_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetDiscountRequest {
    pub transaction_id: String,
    /// Defaults to sending the correction email.
    #[serde(default = "default_send_correction")]
    pub send_correction_email: bool,
}

fn default_send_correction() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetDiscountResult {
    pub transaction_id: String,
    pub email_sent: bool,
    pub referrer_email: String,
    pub reversed_amount_cents: i64,
    pub correction_email_sent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRow {
    pub id: String,
    pub referrer_code: String,
    pub referrer_email: Option<String>,
    pub new_customer_id: String,
    pub new_customer_email: Option<String>,
    pub new_customer_name: Option<String>,
    pub discount_rate: String,
    pub original_price_cents: Option<i64>,
    pub final_price_cents: Option<i64>,
    pub discount_amount_cents: Option<i64>,
    pub referral_level: i64,
    pub is_bonus: bool,
    pub invoice_status: InvoiceStatus,
    pub email_sent: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountsList {
    pub pending: Vec<DiscountRow>,
    pub sent: Vec<DiscountRow>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub transaction_id: String,
    pub referrer_id: Option<String>,
    pub referral_count: i64,
    pub reference_cleared: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCustomerRequest {
    pub email: String,
    pub name: Option<String>,
    pub referral_code: String,
    pub base_price_cents: i64,
    /// Referral code of an existing customer, when registering through one.
    pub reference: Option<String>,
}

impl From<DisplayTransaction> for DiscountRow {
    fn from(row: DisplayTransaction) -> Self {
        DiscountRow {
            id: row.id,
            referrer_code: row.referrer_code,
            referrer_email: row.referrer_email,
            new_customer_id: row.new_customer_id,
            new_customer_email: row.new_customer_email,
            new_customer_name: row.new_customer_name,
            discount_rate: row.rate_label,
            original_price_cents: row.original_price_cents,
            final_price_cents: row.final_price_cents,
            discount_amount_cents: row.discount_amount_cents,
            referral_level: row.referral_level,
            is_bonus: row.is_bonus,
            invoice_status: row.invoice_status,
            email_sent: row.email_sent,
            created_at: row.created_at.to_rfc3339(),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The wired-up engine. Cheap to clone; all parts are shared handles.
#[derive(Clone)]
pub struct DiscountEngine {
    db: Database,
    notifier: Arc<dyn Notifier>,
    templates: Arc<dyn EmailTemplates>,
    config: EngineConfig,
}

impl DiscountEngine {
    /// Engine with the log notifier and default templates.
    pub fn new(db: Database) -> Self {
        DiscountEngine {
            db,
            notifier: Arc::new(LogNotifier),
            templates: Arc::new(DefaultTemplates),
            config: EngineConfig::default(),
        }
    }

    /// Swaps in a real notification transport.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Swaps in custom email wording.
    pub fn with_templates(mut self, templates: Arc<dyn EmailTemplates>) -> Self {
        self.templates = templates;
        self
    }

    /// Overrides the pipeline tunables.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Read access to the underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Use Cases
    // =========================================================================

    /// Sends the discount notification for a pending transaction:
    /// validate, compute, update the referrer, email, mark sent.
    pub async fn send_discount(
        &self,
        request: SendDiscountRequest,
    ) -> EngineResult<SendDiscountResult> {
        let validated = validate_send(&self.db, &request.transaction_id, &request.discount_rate)
            .await?;
        let computed = compute_send(&validated, self.templates.as_ref(), Utc::now());
        let quote = computed.quote;

        persist_send(
            &self.db,
            self.notifier.as_ref(),
            &self.config,
            &validated.referrer.id,
            &validated.transaction.id,
            &computed,
        )
        .await?;

        info!(
            transaction_id = %validated.transaction.id,
            referrer = %validated.referrer.referral_code,
            rate = validated.rate.percent,
            is_bonus = validated.rate.is_bonus,
            "discount notification sent"
        );

        Ok(SendDiscountResult {
            transaction_id: validated.transaction.id,
            email_sent: true,
            referrer_email: validated.referrer.email,
            rate_percent: validated.rate.percent,
            is_bonus: validated.rate.is_bonus,
            previous_price_cents: quote.previous_price.cents(),
            new_price_cents: quote.new_price.cents(),
            discount_amount_cents: quote.discount_amount.cents(),
        })
    }

    /// Resets a sent notification and emails the correction.
    pub async fn reset_discount(
        &self,
        request: ResetDiscountRequest,
    ) -> EngineResult<ResetDiscountResult> {
        let outcome = reset_discount(
            &self.db,
            self.notifier.as_ref(),
            self.templates.as_ref(),
            &self.config,
            &request.transaction_id,
            request.send_correction_email,
            Utc::now(),
        )
        .await?;

        info!(
            transaction_id = %outcome.transaction_id,
            correction_sent = outcome.correction_sent,
            "discount notification reset"
        );

        Ok(ResetDiscountResult {
            transaction_id: outcome.transaction_id,
            email_sent: false,
            referrer_email: outcome.referrer_email,
            reversed_amount_cents: outcome.reversed_amount.cents(),
            correction_email_sent: outcome.correction_sent,
        })
    }

    /// Lists all transactions with derived bonus levels, split into
    /// pending and sent buckets, oldest first within each.
    pub async fn list_discounts(
        &self,
        status: Option<InvoiceStatus>,
    ) -> EngineResult<DiscountsList> {
        let listing = list::list_discounts(&self.db, status).await?;
        let total = listing.len();
        let pending: Vec<DiscountRow> =
            listing.pending.into_iter().map(DiscountRow::from).collect();
        let sent: Vec<DiscountRow> = listing.sent.into_iter().map(DiscountRow::from).collect();

        Ok(DiscountsList {
            pending,
            sent,
            total,
        })
    }

    /// Deletes a transaction and recomputes its referrer.
    pub async fn delete_transaction(&self, transaction_id: &str) -> EngineResult<DeleteResult> {
        let outcome = list::delete_transaction(&self.db, transaction_id).await?;

        info!(
            transaction_id = %outcome.transaction_id,
            referral_count = outcome.referral_count,
            "transaction deleted"
        );

        Ok(DeleteResult {
            transaction_id: outcome.transaction_id,
            referrer_id: outcome.referrer_id,
            referral_count: outcome.referral_count,
            reference_cleared: outcome.reference_cleared,
        })
    }

    /// Registers a customer at their base price. When they register through
    /// someone's referral code, the matching transaction is recorded too.
    pub async fn register_customer(
        &self,
        request: RegisterCustomerRequest,
    ) -> EngineResult<Customer> {
        validation::validate_email(&request.email)?;
        validation::validate_referral_code(&request.referral_code)?;
        validation::validate_price_cents(request.base_price_cents)?;

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            email: request.email,
            name: request.name,
            referral_code: request.referral_code,
            reference: request.reference.clone(),
            base_price_cents: request.base_price_cents,
            final_price_cents: request.base_price_cents,
            discount_rate: 0,
            referral_count: 0,
            total_earnings_cents: 0,
            created_at: now,
            updated_at: now,
        };
        self.db.customers().insert(&customer).await?;

        if let Some(code) = request.reference {
            self.record_referral_use(&code, &customer.id).await?;
        }

        Ok(customer)
    }

    /// Records one use of a referral code: creates the immutable
    /// transaction and advances the referrer's count. The referrer's price
    /// only changes later, when the notification for this transaction is
    /// sent.
    pub async fn record_referral_use(
        &self,
        code: &str,
        new_customer_id: &str,
    ) -> EngineResult<ReferralTransaction> {
        validation::validate_referral_code(code)?;

        let referrer = self
            .db
            .customers()
            .find_by_referral_code(code)
            .await?
            .ok_or_else(|| EngineError::not_found("Referrer", code))?;

        let prior = referrer.referral_count;
        let is_bonus = prior >= MAX_STAGED_REFERRALS;
        let level = (prior + 1).min(MAX_STAGED_REFERRALS);
        let now = Utc::now();

        // staged rows snapshot their step prices at creation; bonus rows
        // get theirs stamped at send time from the then-current price
        let (original, fin, amount, rate) = if is_bonus {
            (None, None, None, 3)
        } else {
            let base = referrer.base_price();
            let before = discount::price_at_level(base, level - 1);
            let after = discount::price_at_level(base, level);
            (
                Some(before.cents()),
                Some(after.cents()),
                Some((before - after).cents()),
                discount::step_rate_percent(level),
            )
        };

        let transaction = ReferralTransaction {
            id: Uuid::new_v4().to_string(),
            referrer_code: code.to_string(),
            new_customer_id: new_customer_id.to_string(),
            discount_rate: rate,
            original_price_cents: original,
            final_price_cents: fin,
            discount_amount_cents: amount,
            referral_level: level,
            is_bonus,
            invoice_status: InvoiceStatus::Pending,
            email_sent: false,
            created_at: now,
            updated_at: now,
        };
        self.db.transactions().insert(&transaction).await?;
        self.db
            .customers()
            .set_referral_count(&referrer.id, prior + 1, now)
            .await?;

        info!(
            code = %code,
            new_customer_id = %new_customer_id,
            referral_count = prior + 1,
            is_bonus,
            "referral use recorded"
        );

        Ok(transaction)
    }
}

// =============================================================================
// Integration-Style Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::doubles::RecordingNotifier;
    use referral_db::DbConfig;

    async fn engine_with_recorder() -> (DiscountEngine, Arc<RecordingNotifier>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = DiscountEngine::new(db).with_notifier(notifier.clone());
        (engine, notifier)
    }

    async fn register(engine: &DiscountEngine, code: &str, reference: Option<&str>) -> Customer {
        engine
            .register_customer(RegisterCustomerRequest {
                email: format!("{}@example.com", code.to_lowercase()),
                name: None,
                referral_code: code.to_string(),
                base_price_cents: 10000,
                reference: reference.map(str::to_string),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_full_referral_lifecycle() {
        let (engine, notifier) = engine_with_recorder().await;

        let anna = register(&engine, "ANNA-1", None).await;
        register(&engine, "BOB-1", Some("ANNA-1")).await;

        // the registration through Anna's code created a pending transaction
        let listed = engine.list_discounts(None).await.unwrap();
        assert_eq!(listed.total, 1);
        assert!(listed.sent.is_empty());
        let row = listed.pending[0].clone();
        assert_eq!(row.referrer_code, "ANNA-1");
        assert_eq!(row.referral_level, 1);
        assert!(!row.email_sent);
        // both sides of the referral are readable off the row
        assert_eq!(row.referrer_email.as_deref(), Some("anna-1@example.com"));
        assert_eq!(row.new_customer_email.as_deref(), Some("bob-1@example.com"));

        // send at 3%: 100.00 → 97.00
        let sent = engine
            .send_discount(SendDiscountRequest {
                transaction_id: row.id.clone(),
                discount_rate: RateInput::Percent(3),
            })
            .await
            .unwrap();
        assert_eq!(sent.previous_price_cents, 10000);
        assert_eq!(sent.new_price_cents, 9700);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);

        let anna_after = engine.db().customers().find_by_id(&anna.id).await.unwrap().unwrap();
        assert_eq!(anna_after.final_price_cents, 9700);
        assert_eq!(anna_after.discount_rate, 3);
        assert_eq!(anna_after.referral_count, 1);

        // double send is refused
        let err = engine
            .send_discount(SendDiscountRequest {
                transaction_id: row.id.clone(),
                discount_rate: RateInput::Percent(3),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // reset, then the send works again
        let reset = engine
            .reset_discount(ResetDiscountRequest {
                transaction_id: row.id.clone(),
                send_correction_email: true,
            })
            .await
            .unwrap();
        assert!(!reset.email_sent);
        assert!(reset.correction_email_sent);
        assert_eq!(reset.reversed_amount_cents, 300);
        assert_eq!(notifier.corrections.lock().unwrap().len(), 1);

        engine
            .send_discount(SendDiscountRequest {
                transaction_id: row.id.clone(),
                discount_rate: RateInput::Percent(3),
            })
            .await
            .unwrap();

        // the listing now reports the row in the sent bucket
        let listed = engine.list_discounts(None).await.unwrap();
        assert!(listed.pending.is_empty());
        assert_eq!(listed.sent.len(), 1);
        assert_eq!(listed.total, 1);
        assert!(listed.sent[0].email_sent);
    }

    #[tokio::test]
    async fn test_fourth_referral_takes_the_bonus_path() {
        let (engine, _notifier) = engine_with_recorder().await;

        register(&engine, "ANNA-1", None).await;
        for i in 0..4 {
            register(&engine, &format!("REF-{i}"), Some("ANNA-1")).await;
        }

        let listed = engine.list_discounts(None).await.unwrap();
        assert_eq!(listed.total, 4);

        // stored cap at 3; the 4th row is a bonus transaction
        let fourth = &listed.pending[3];
        assert!(fourth.is_bonus);
        assert_eq!(fourth.referral_level, 4);
        assert_eq!(fourth.discount_rate, "+3");

        // standard rates are refused only by value, the bonus sentinel works
        let sent = engine
            .send_discount(SendDiscountRequest {
                transaction_id: fourth.id.clone(),
                discount_rate: RateInput::Sentinel("+3".to_string()),
            })
            .await
            .unwrap();
        assert!(sent.is_bonus);
        assert_eq!(sent.rate_percent, 3);
    }

    #[tokio::test]
    async fn test_delete_after_send_rolls_the_referrer_back() {
        let (engine, _notifier) = engine_with_recorder().await;

        let anna = register(&engine, "ANNA-1", None).await;
        register(&engine, "BOB-1", Some("ANNA-1")).await;

        let listed = engine.list_discounts(None).await.unwrap();
        let tx_id = listed.pending[0].id.clone();

        engine
            .send_discount(SendDiscountRequest {
                transaction_id: tx_id.clone(),
                discount_rate: RateInput::Percent(3),
            })
            .await
            .unwrap();

        let deleted = engine.delete_transaction(&tx_id).await.unwrap();
        assert_eq!(deleted.referral_count, 0);
        assert!(deleted.reference_cleared);

        let anna_after = engine.db().customers().find_by_id(&anna.id).await.unwrap().unwrap();
        assert_eq!(anna_after.referral_count, 0);
        assert_eq!(anna_after.discount_rate, 0);
        assert_eq!(anna_after.final_price_cents, 10000);
    }

    #[test]
    fn test_reset_request_correction_defaults_on() {
        let request: ResetDiscountRequest =
            serde_json::from_str(r#"{"transactionId":"t1"}"#).unwrap();
        assert!(request.send_correction_email);

        let request: ResetDiscountRequest =
            serde_json::from_str(r#"{"transactionId":"t1","sendCorrectionEmail":false}"#).unwrap();
        assert!(!request.send_correction_email);
    }

    #[tokio::test]
    async fn test_record_referral_use_unknown_code() {
        let (engine, _notifier) = engine_with_recorder().await;
        let err = engine.record_referral_use("GHOST", "c1").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
