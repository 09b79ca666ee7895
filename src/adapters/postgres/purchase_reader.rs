//! PostgreSQL implementation of PurchaseReader.
//!
//! Display fields come from an explicit join against the offerings
//! table; purchase rows stay free of denormalized display data.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, EventId, OfferingId, ProgramId, PurchaseId, Timestamp, UserId,
};
use crate::domain::purchase::OrderNumber;
use crate::ports::{PendingPurchaseView, PurchaseReader};

/// PostgreSQL implementation of the PurchaseReader port.
pub struct PostgresPurchaseReader {
    pool: PgPool,
}

impl PostgresPurchaseReader {
    /// Creates a new reader with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PendingViewRow {
    id: Uuid,
    order_number: String,
    program_id: Option<Uuid>,
    event_id: Option<Uuid>,
    offering_title: String,
    final_price: i64,
    currency: String,
    is_class_rep: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PendingViewRow> for PendingPurchaseView {
    type Error = DomainError;

    fn try_from(row: PendingViewRow) -> Result<Self, Self::Error> {
        let offering = match (row.program_id, row.event_id) {
            (Some(id), None) => OfferingId::Program(ProgramId::from_uuid(id)),
            (None, Some(id)) => OfferingId::Event(EventId::from_uuid(id)),
            _ => {
                return Err(DomainError::database(
                    "purchase row must reference exactly one of program_id or event_id",
                ))
            }
        };

        Ok(PendingPurchaseView {
            id: PurchaseId::from_uuid(row.id),
            order_number: OrderNumber::from_string(row.order_number)
                .map_err(|e| DomainError::database(format!("Invalid order number: {}", e)))?,
            offering,
            offering_title: row.offering_title,
            final_price: row.final_price,
            currency: row.currency,
            is_class_rep: row.is_class_rep,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl PurchaseReader for PostgresPurchaseReader {
    async fn list_pending(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PendingPurchaseView>, DomainError> {
        let rows: Vec<PendingViewRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.order_number, p.program_id, p.event_id,
                   o.title AS offering_title, p.final_price, o.currency,
                   p.is_class_rep, p.created_at
            FROM purchases p
            JOIN offerings o ON o.id = COALESCE(p.program_id, p.event_id)
            WHERE p.user_id = $1 AND p.status = 'pending'
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list pending purchases: {}", e)))?;

        rows.into_iter().map(PendingPurchaseView::try_from).collect()
    }
}
