//! PostgreSQL implementation of PurchaseRepository.
//!
//! Every lifecycle mutation is one guarded `UPDATE`/`DELETE` whose
//! predicate carries the expected status, so concurrent webhook
//! deliveries and double-submitted requests serialize on the row without
//! an external lock. Uniqueness invariants (one completed purchase per
//! buyer and offering) are backed by partial unique indexes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, EventId, OfferingId, ProgramId, PurchaseId, Timestamp, UserId,
};
use crate::domain::purchase::{
    BillingDetails, OrderNumber, PriceQuote, Purchase, PurchaseStatus,
};
use crate::ports::{CompletionOutcome, FailureOutcome, PurchaseRepository};

/// PostgreSQL implementation of the PurchaseRepository port.
pub struct PostgresPurchaseRepository {
    pool: PgPool,
}

impl PostgresPurchaseRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a purchase.
#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    program_id: Option<Uuid>,
    event_id: Option<Uuid>,
    full_price: i64,
    class_rep_discount: i64,
    early_bird_discount: i64,
    promo_discount: i64,
    final_price: i64,
    is_class_rep: bool,
    is_early_bird: bool,
    status: String,
    stripe_session_id: String,
    stripe_payment_intent_id: Option<String>,
    purchase_date: Option<DateTime<Utc>>,
    cardholder_name: Option<String>,
    card_brand: Option<String>,
    card_last4: Option<String>,
    billing_address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const PURCHASE_COLUMNS: &str = "id, order_number, user_id, program_id, event_id, full_price, \
     class_rep_discount, early_bird_discount, promo_discount, final_price, is_class_rep, \
     is_early_bird, status, stripe_session_id, stripe_payment_intent_id, purchase_date, \
     cardholder_name, card_brand, card_last4, billing_address, created_at, updated_at";

impl TryFrom<PurchaseRow> for Purchase {
    type Error = DomainError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        let offering = offering_from_columns(row.program_id, row.event_id)?;
        let status = PurchaseStatus::parse(&row.status).ok_or_else(|| {
            DomainError::database(format!("Invalid status value: {}", row.status))
        })?;
        let order_number = OrderNumber::from_string(row.order_number).map_err(|e| {
            DomainError::database(format!("Invalid order number: {}", e))
        })?;

        Ok(Purchase {
            id: PurchaseId::from_uuid(row.id),
            order_number,
            user_id: UserId::from_uuid(row.user_id),
            offering,
            pricing: PriceQuote {
                full_price: row.full_price,
                class_rep_discount: row.class_rep_discount,
                early_bird_discount: row.early_bird_discount,
                promo_discount: row.promo_discount,
                final_price: row.final_price,
                is_class_rep: row.is_class_rep,
                is_early_bird: row.is_early_bird,
            },
            status,
            stripe_session_id: row.stripe_session_id,
            stripe_payment_intent_id: row.stripe_payment_intent_id,
            purchase_date: row.purchase_date.map(Timestamp::from_datetime),
            billing: BillingDetails {
                cardholder_name: row.cardholder_name,
                card_brand: row.card_brand,
                card_last4: row.card_last4,
                billing_address: row.billing_address,
            },
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn offering_from_columns(
    program_id: Option<Uuid>,
    event_id: Option<Uuid>,
) -> Result<OfferingId, DomainError> {
    match (program_id, event_id) {
        (Some(id), None) => Ok(OfferingId::Program(ProgramId::from_uuid(id))),
        (None, Some(id)) => Ok(OfferingId::Event(EventId::from_uuid(id))),
        _ => Err(DomainError::database(
            "purchase row must reference exactly one of program_id or event_id",
        )),
    }
}

fn offering_columns(offering: &OfferingId) -> (Option<Uuid>, Option<Uuid>) {
    (
        offering.program_id().map(|id| *id.as_uuid()),
        offering.event_id().map(|id| *id.as_uuid()),
    )
}

fn db_err(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

#[async_trait]
impl PurchaseRepository for PostgresPurchaseRepository {
    async fn insert(&self, purchase: &Purchase) -> Result<(), DomainError> {
        let (program_id, event_id) = offering_columns(&purchase.offering);

        // The completed-sibling guard runs inside the same statement so a
        // concurrent completion cannot slip between check and insert
        let result = sqlx::query(
            r#"
            INSERT INTO purchases (
                id, order_number, user_id, program_id, event_id, full_price,
                class_rep_discount, early_bird_discount, promo_discount, final_price,
                is_class_rep, is_early_bird, status, stripe_session_id,
                stripe_payment_intent_id, purchase_date, created_at, updated_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18
            WHERE NOT EXISTS (
                SELECT 1 FROM purchases
                WHERE user_id = $3
                  AND COALESCE(program_id, event_id) = COALESCE($4, $5)
                  AND status = 'completed'
            )
            "#,
        )
        .bind(purchase.id.as_uuid())
        .bind(purchase.order_number.as_str())
        .bind(purchase.user_id.as_uuid())
        .bind(program_id)
        .bind(event_id)
        .bind(purchase.pricing.full_price)
        .bind(purchase.pricing.class_rep_discount)
        .bind(purchase.pricing.early_bird_discount)
        .bind(purchase.pricing.promo_discount)
        .bind(purchase.pricing.final_price)
        .bind(purchase.pricing.is_class_rep)
        .bind(purchase.pricing.is_early_bird)
        .bind(purchase.status.as_str())
        .bind(&purchase.stripe_session_id)
        .bind(&purchase.stripe_payment_intent_id)
        .bind(purchase.purchase_date.map(|t| *t.as_datetime()))
        .bind(purchase.created_at.as_datetime())
        .bind(purchase.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.constraint() == Some("purchases_one_pending_per_offering") {
                    return DomainError::database(
                        "pending purchase already exists for this offering",
                    );
                }
                if db.constraint() == Some("purchases_one_completed_per_offering") {
                    return DomainError::new(
                        ErrorCode::AlreadyPurchased,
                        "A completed purchase already exists for this offering",
                    );
                }
            }
            db_err("Failed to insert purchase", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::AlreadyPurchased,
                "A completed purchase already exists for this offering",
            ));
        }

        Ok(())
    }

    async fn update_pending(&self, purchase: &Purchase) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE purchases SET
                full_price = $2,
                class_rep_discount = $3,
                early_bird_discount = $4,
                promo_discount = $5,
                final_price = $6,
                is_class_rep = $7,
                is_early_bird = $8,
                stripe_session_id = $9,
                stripe_payment_intent_id = $10,
                updated_at = $11
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(purchase.id.as_uuid())
        .bind(purchase.pricing.full_price)
        .bind(purchase.pricing.class_rep_discount)
        .bind(purchase.pricing.early_bird_discount)
        .bind(purchase.pricing.promo_discount)
        .bind(purchase.pricing.final_price)
        .bind(purchase.pricing.is_class_rep)
        .bind(purchase.pricing.is_early_bird)
        .bind(&purchase.stripe_session_id)
        .bind(&purchase.stripe_payment_intent_id)
        .bind(purchase.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to update pending purchase", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: &PurchaseId) -> Result<Option<Purchase>, DomainError> {
        let row: Option<PurchaseRow> = sqlx::query_as(&format!(
            "SELECT {} FROM purchases WHERE id = $1",
            PURCHASE_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to find purchase", e))?;

        row.map(Purchase::try_from).transpose()
    }

    async fn find_pending_for_offering(
        &self,
        user_id: &UserId,
        offering: &OfferingId,
    ) -> Result<Option<Purchase>, DomainError> {
        let row: Option<PurchaseRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM purchases
            WHERE user_id = $1
              AND COALESCE(program_id, event_id) = $2
              AND status = 'pending'
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(user_id.as_uuid())
        .bind(offering.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to find pending purchase", e))?;

        row.map(Purchase::try_from).transpose()
    }

    async fn completed_exists(
        &self,
        user_id: &UserId,
        offering: &OfferingId,
    ) -> Result<bool, DomainError> {
        let exists: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM purchases
            WHERE user_id = $1
              AND COALESCE(program_id, event_id) = $2
              AND status = 'completed'
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(offering.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to check completed purchase", e))?;

        Ok(exists.is_some())
    }

    async fn complete_by_session(
        &self,
        session_id: &str,
        payment_intent_id: Option<&str>,
        completed_at: Timestamp,
    ) -> Result<CompletionOutcome, DomainError> {
        let row: Option<PurchaseRow> = sqlx::query_as(&format!(
            r#"
            UPDATE purchases SET
                status = 'completed',
                purchase_date = $3,
                stripe_payment_intent_id = COALESCE(stripe_payment_intent_id, $2),
                updated_at = $3
            WHERE stripe_session_id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(session_id)
        .bind(payment_intent_id)
        .bind(completed_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to complete purchase by session", e))?;

        if let Some(row) = row {
            return Ok(CompletionOutcome::Completed(row.try_into()?));
        }

        // Lost the guarded update: either a duplicate delivery (record is
        // completed) or the record is gone/terminal
        let existing: Option<PurchaseRow> = sqlx::query_as(&format!(
            "SELECT {} FROM purchases WHERE stripe_session_id = $1",
            PURCHASE_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to re-read purchase by session", e))?;

        match existing {
            Some(row) if row.status == "completed" => {
                Ok(CompletionOutcome::AlreadyCompleted(row.try_into()?))
            }
            _ => Ok(CompletionOutcome::NotFound),
        }
    }

    async fn complete_by_payment_intent(
        &self,
        payment_intent_id: &str,
        completed_at: Timestamp,
    ) -> Result<CompletionOutcome, DomainError> {
        let row: Option<PurchaseRow> = sqlx::query_as(&format!(
            r#"
            UPDATE purchases SET
                status = 'completed',
                purchase_date = $2,
                updated_at = $2
            WHERE stripe_payment_intent_id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(payment_intent_id)
        .bind(completed_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to complete purchase by payment intent", e))?;

        if let Some(row) = row {
            return Ok(CompletionOutcome::Completed(row.try_into()?));
        }

        let existing: Option<PurchaseRow> = sqlx::query_as(&format!(
            "SELECT {} FROM purchases WHERE stripe_payment_intent_id = $1",
            PURCHASE_COLUMNS
        ))
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to re-read purchase by payment intent", e))?;

        match existing {
            Some(row) if row.status == "completed" => {
                Ok(CompletionOutcome::AlreadyCompleted(row.try_into()?))
            }
            _ => Ok(CompletionOutcome::NotFound),
        }
    }

    async fn record_billing_details(
        &self,
        id: &PurchaseId,
        details: &BillingDetails,
    ) -> Result<(), DomainError> {
        // COALESCE keeps populated fields: duplicate events never
        // blank-overwrite the captured snapshot
        sqlx::query(
            r#"
            UPDATE purchases SET
                cardholder_name = COALESCE(cardholder_name, $2),
                card_brand = COALESCE(card_brand, $3),
                card_last4 = COALESCE(card_last4, $4),
                billing_address = COALESCE(billing_address, $5)
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&details.cardholder_name)
        .bind(&details.card_brand)
        .bind(&details.card_last4)
        .bind(&details.billing_address)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to record billing details", e))?;

        Ok(())
    }

    async fn fail_by_payment_intent(
        &self,
        payment_intent_id: &str,
        failed_at: Timestamp,
    ) -> Result<FailureOutcome, DomainError> {
        let row: Option<PurchaseRow> = sqlx::query_as(&format!(
            r#"
            UPDATE purchases SET
                status = 'failed',
                updated_at = $2
            WHERE stripe_payment_intent_id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(payment_intent_id)
        .bind(failed_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to mark purchase failed", e))?;

        if let Some(row) = row {
            return Ok(FailureOutcome::Failed(row.try_into()?));
        }

        let exists: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM purchases WHERE stripe_payment_intent_id = $1",
        )
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to re-read purchase by payment intent", e))?;

        if exists.is_some() {
            Ok(FailureOutcome::AlreadyTerminal)
        } else {
            Ok(FailureOutcome::NotFound)
        }
    }

    async fn delete_pending(&self, id: &PurchaseId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM purchases WHERE id = $1 AND status = 'pending'")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("Failed to delete pending purchase", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_pending(
        &self,
        user_id: &UserId,
        cutoff: Timestamp,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            DELETE FROM purchases
            WHERE user_id = $1 AND status = 'pending' AND updated_at < $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(cutoff.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to purge expired pending purchases", e))?;

        Ok(result.rows_affected())
    }

    async fn purge_superseded_pending(&self, user_id: &UserId) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            DELETE FROM purchases p
            WHERE p.user_id = $1
              AND p.status = 'pending'
              AND EXISTS (
                  SELECT 1 FROM purchases c
                  WHERE c.user_id = p.user_id
                    AND c.status = 'completed'
                    AND COALESCE(c.program_id, c.event_id)
                        = COALESCE(p.program_id, p.event_id)
              )
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to purge superseded pending purchases", e))?;

        Ok(result.rows_affected())
    }
}
