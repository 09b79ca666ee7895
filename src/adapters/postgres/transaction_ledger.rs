//! PostgreSQL implementation of TransactionLedger.
//!
//! Idempotency rides on the unique `(donation_id,
//! stripe_payment_intent_id)` constraint: `ON CONFLICT DO NOTHING` turns
//! a redelivered billing event into a no-op instead of a duplicate row.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::donation::DonationTransaction;
use crate::domain::foundation::DomainError;
use crate::ports::{LedgerOutcome, TransactionLedger};

/// PostgreSQL implementation of the TransactionLedger port.
pub struct PostgresTransactionLedger {
    pool: PgPool,
}

impl PostgresTransactionLedger {
    /// Creates a new ledger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionLedger for PostgresTransactionLedger {
    async fn record(&self, tx: &DonationTransaction) -> Result<LedgerOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO donation_transactions (
                id, donation_id, stripe_payment_intent_id, amount, currency, paid_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (donation_id, stripe_payment_intent_id) DO NOTHING
            "#,
        )
        .bind(tx.id.as_uuid())
        .bind(tx.donation_id.as_uuid())
        .bind(&tx.stripe_payment_intent_id)
        .bind(tx.amount)
        .bind(&tx.currency)
        .bind(tx.paid_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record transaction: {}", e)))?;

        if result.rows_affected() > 0 {
            Ok(LedgerOutcome::Recorded)
        } else {
            Ok(LedgerOutcome::DuplicateCycle)
        }
    }
}
