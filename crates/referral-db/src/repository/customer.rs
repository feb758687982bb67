//! # Customer Repository
//!
//! Database operations for customers, the referrer store.
//!
//! The cached discount fields (`final_price_cents`, `discount_rate`,
//! `referral_count`, `total_earnings_cents`) are only written through the
//! dedicated update methods here, which the send pipeline and the delete
//! recompute call. Nothing else mutates them.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use referral_core::{Customer, ReferrerUpdate};

const CUSTOMER_COLUMNS: &str = "id, email, name, referral_code, reference, \
     base_price_cents, final_price_cents, discount_rate, referral_count, \
     total_earnings_cents, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by id.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Gets a customer by their own referral code (the referrer lookup).
    pub async fn find_by_referral_code(&self, code: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE referral_code = ?1");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer)
    }

    /// Inserts a new customer.
    ///
    /// ## Errors
    /// `DbError::Duplicate` when the email or referral code already exists.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, referral_code = %customer.referral_code, "inserting customer");

        sqlx::query(
            "INSERT INTO customers ( \
                 id, email, name, referral_code, reference, \
                 base_price_cents, final_price_cents, discount_rate, referral_count, \
                 total_earnings_cents, created_at, updated_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&customer.id)
        .bind(&customer.email)
        .bind(&customer.name)
        .bind(&customer.referral_code)
        .bind(&customer.reference)
        .bind(customer.base_price_cents)
        .bind(customer.final_price_cents)
        .bind(customer.discount_rate)
        .bind(customer.referral_count)
        .bind(customer.total_earnings_cents)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Applies a send-pipeline update to the cached discount fields.
    pub async fn apply_discount_update(&self, id: &str, update: &ReferrerUpdate) -> DbResult<()> {
        debug!(
            id = %id,
            discount_rate = update.discount_rate,
            final_price_cents = update.final_price_cents,
            "applying referrer discount update"
        );

        let result = sqlx::query(
            "UPDATE customers SET \
                 discount_rate = ?2, \
                 final_price_cents = ?3, \
                 updated_at = ?4 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(update.discount_rate)
        .bind(update.final_price_cents)
        .bind(update.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Sets the referral count (used when a referral code is recorded).
    pub async fn set_referral_count(
        &self,
        id: &str,
        referral_count: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE customers SET referral_count = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(referral_count)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Writes a full recompute of the cached fields after a transaction
    /// deletion.
    pub async fn apply_recompute(
        &self,
        id: &str,
        referral_count: i64,
        discount_rate: i64,
        final_price_cents: i64,
        total_earnings_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(
            id = %id,
            referral_count,
            discount_rate,
            final_price_cents,
            "recomputing referrer cached fields"
        );

        let result = sqlx::query(
            "UPDATE customers SET \
                 referral_count = ?2, \
                 discount_rate = ?3, \
                 final_price_cents = ?4, \
                 total_earnings_cents = ?5, \
                 updated_at = ?6 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(referral_count)
        .bind(discount_rate)
        .bind(final_price_cents)
        .bind(total_earnings_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Clears a customer's `reference` link, but only if it still points at
    /// the given referral code. Returns whether a link was cleared.
    ///
    /// Conditional so a customer who re-registered with a different code in
    /// the meantime keeps their newer link.
    pub async fn clear_reference(
        &self,
        customer_id: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE customers SET reference = NULL, updated_at = ?3 \
             WHERE id = ?1 AND reference = ?2",
        )
        .bind(customer_id)
        .bind(code)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
