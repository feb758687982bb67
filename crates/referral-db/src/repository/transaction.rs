//! # Transaction Repository
//!
//! Database operations for referral transactions.
//!
//! The email lifecycle transitions (`mark_sent`, `reset_sent`) are single
//! conditional UPDATE statements guarded on the current `email_sent` value.
//! Two concurrent sends of the same transaction cannot both succeed: the
//! loser's UPDATE matches zero rows and comes back as a typed error.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use referral_core::{InvoiceStatus, ReferralTransaction, TransactionUpdate};

const TRANSACTION_COLUMNS: &str = "id, referrer_code, new_customer_id, discount_rate, \
     original_price_cents, final_price_cents, discount_amount_cents, \
     referral_level, is_bonus, invoice_status, email_sent, created_at, updated_at";

/// Repository for referral transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction by id.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<ReferralTransaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM referral_transactions WHERE id = ?1");
        let tx = sqlx::query_as::<_, ReferralTransaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tx)
    }

    /// Lists all transactions, oldest first, optionally filtered by invoice
    /// status.
    pub async fn list(&self, status: Option<InvoiceStatus>) -> DbResult<Vec<ReferralTransaction>> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM referral_transactions \
                     WHERE invoice_status = ?1 \
                     ORDER BY created_at ASC"
                );
                sqlx::query_as::<_, ReferralTransaction>(&sql)
                    .bind(status)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM referral_transactions \
                     ORDER BY created_at ASC"
                );
                sqlx::query_as::<_, ReferralTransaction>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows)
    }

    /// Lists the transactions attributed to one referral code, oldest first.
    pub async fn list_for_code(&self, code: &str) -> DbResult<Vec<ReferralTransaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM referral_transactions \
             WHERE referrer_code = ?1 \
             ORDER BY created_at ASC"
        );
        let rows = sqlx::query_as::<_, ReferralTransaction>(&sql)
            .bind(code)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Counts the transactions attributed to one referral code.
    pub async fn count_for_code(&self, code: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM referral_transactions WHERE referrer_code = ?1",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Inserts a new referral transaction.
    pub async fn insert(&self, tx: &ReferralTransaction) -> DbResult<()> {
        debug!(id = %tx.id, referrer_code = %tx.referrer_code, "inserting referral transaction");

        sqlx::query(
            "INSERT INTO referral_transactions ( \
                 id, referrer_code, new_customer_id, discount_rate, \
                 original_price_cents, final_price_cents, discount_amount_cents, \
                 referral_level, is_bonus, invoice_status, email_sent, \
                 created_at, updated_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&tx.id)
        .bind(&tx.referrer_code)
        .bind(&tx.new_customer_id)
        .bind(tx.discount_rate)
        .bind(tx.original_price_cents)
        .bind(tx.final_price_cents)
        .bind(tx.discount_amount_cents)
        .bind(tx.referral_level)
        .bind(tx.is_bonus)
        .bind(tx.invoice_status)
        .bind(tx.email_sent)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Marks a transaction sent and stamps the computed discount onto it,
    /// in one conditional UPDATE.
    ///
    /// The price snapshot columns use COALESCE so a transaction that already
    /// carries prices keeps them; NULL columns are backfilled from the
    /// update.
    ///
    /// ## Errors
    /// `DbError::NotFound` when the transaction does not exist or its email
    /// was already sent (the guard matched zero rows).
    pub async fn mark_sent(&self, id: &str, update: &TransactionUpdate) -> DbResult<()> {
        debug!(
            id = %id,
            discount_rate = update.discount_rate,
            is_bonus = update.is_bonus,
            "marking transaction sent"
        );

        let result = sqlx::query(
            "UPDATE referral_transactions SET \
                 email_sent = 1, \
                 invoice_status = 'sent', \
                 discount_rate = ?2, \
                 is_bonus = ?3, \
                 referral_level = ?4, \
                 original_price_cents = COALESCE(original_price_cents, ?5), \
                 final_price_cents = COALESCE(final_price_cents, ?6), \
                 discount_amount_cents = COALESCE(discount_amount_cents, ?7), \
                 updated_at = ?8 \
             WHERE id = ?1 AND email_sent = 0",
        )
        .bind(id)
        .bind(update.discount_rate)
        .bind(update.is_bonus)
        .bind(update.referral_level)
        .bind(update.original_price_cents)
        .bind(update.final_price_cents)
        .bind(update.discount_amount_cents)
        .bind(update.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction (unsent)", id));
        }

        Ok(())
    }

    /// Resets a sent transaction back to pending: clears the sent flag and
    /// the bonus flag and restores the invoice status.
    ///
    /// ## Errors
    /// `DbError::NotFound` when the transaction does not exist or was never
    /// sent.
    pub async fn reset_sent(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        debug!(id = %id, "resetting transaction to pending");

        let result = sqlx::query(
            "UPDATE referral_transactions SET \
                 email_sent = 0, \
                 is_bonus = 0, \
                 invoice_status = 'pending', \
                 updated_at = ?2 \
             WHERE id = ?1 AND email_sent = 1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction (sent)", id));
        }

        Ok(())
    }

    /// Deletes a transaction. The caller is responsible for recomputing the
    /// referrer's cached discount afterwards.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "deleting referral transaction");

        let result = sqlx::query("DELETE FROM referral_transactions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
