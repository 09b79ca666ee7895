//! PostgreSQL implementation of OfferingCatalog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, EventId, OfferingId, ProgramId, Timestamp,
};
use crate::domain::purchase::Offering;
use crate::ports::OfferingCatalog;

/// PostgreSQL implementation of the OfferingCatalog port.
pub struct PostgresOfferingCatalog {
    pool: PgPool,
}

impl PostgresOfferingCatalog {
    /// Creates a new catalog with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an offering.
#[derive(Debug, sqlx::FromRow)]
struct OfferingRow {
    id: Uuid,
    kind: String,
    title: String,
    price: i64,
    currency: String,
    class_rep_discount: i64,
    early_bird_discount: i64,
    early_bird_deadline: Option<DateTime<Utc>>,
    class_rep_limit: i32,
}

impl TryFrom<OfferingRow> for Offering {
    type Error = DomainError;

    fn try_from(row: OfferingRow) -> Result<Self, Self::Error> {
        let id = match row.kind.as_str() {
            "program" => OfferingId::Program(ProgramId::from_uuid(row.id)),
            "event" => OfferingId::Event(EventId::from_uuid(row.id)),
            other => {
                return Err(DomainError::database(format!(
                    "Invalid offering kind: {}",
                    other
                )))
            }
        };

        Ok(Offering {
            id,
            title: row.title,
            price: row.price,
            currency: row.currency,
            class_rep_discount: row.class_rep_discount,
            early_bird_discount: row.early_bird_discount,
            early_bird_deadline: row.early_bird_deadline.map(Timestamp::from_datetime),
            class_rep_limit: row.class_rep_limit,
        })
    }
}

#[async_trait]
impl OfferingCatalog for PostgresOfferingCatalog {
    async fn find(&self, id: &OfferingId) -> Result<Option<Offering>, DomainError> {
        let kind = match id {
            OfferingId::Program(_) => "program",
            OfferingId::Event(_) => "event",
        };

        let row: Option<OfferingRow> = sqlx::query_as(
            r#"
            SELECT id, kind, title, price, currency, class_rep_discount,
                   early_bird_discount, early_bird_deadline, class_rep_limit
            FROM offerings
            WHERE id = $1 AND kind = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(kind)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find offering: {}", e)))?;

        row.map(Offering::try_from).transpose()
    }
}
