//! PostgreSQL implementation of DonationRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::donation::Donation;
use crate::domain::foundation::{DomainError, DonationId, Timestamp, UserId};
use crate::ports::DonationRepository;

/// PostgreSQL implementation of the DonationRepository port.
pub struct PostgresDonationRepository {
    pool: PgPool,
}

impl PostgresDonationRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a donation.
#[derive(Debug, sqlx::FromRow)]
struct DonationRow {
    id: Uuid,
    user_id: Uuid,
    amount: i64,
    currency: String,
    stripe_session_id: Option<String>,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DonationRow> for Donation {
    fn from(row: DonationRow) -> Self {
        Donation {
            id: DonationId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            amount: row.amount,
            currency: row.currency,
            stripe_session_id: row.stripe_session_id,
            stripe_customer_id: row.stripe_customer_id,
            stripe_subscription_id: row.stripe_subscription_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

const DONATION_COLUMNS: &str = "id, user_id, amount, currency, stripe_session_id, \
     stripe_customer_id, stripe_subscription_id, created_at, updated_at";

#[async_trait]
impl DonationRepository for PostgresDonationRepository {
    async fn find_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<Donation>, DomainError> {
        let row: Option<DonationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM donations WHERE stripe_session_id = $1",
            DONATION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find donation: {}", e)))?;

        Ok(row.map(Donation::from))
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Donation>, DomainError> {
        let row: Option<DonationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM donations WHERE stripe_subscription_id = $1",
            DONATION_COLUMNS
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find donation: {}", e)))?;

        Ok(row.map(Donation::from))
    }

    async fn update(&self, donation: &Donation) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE donations SET
                stripe_customer_id = $2,
                stripe_subscription_id = $3,
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(donation.id.as_uuid())
        .bind(&donation.stripe_customer_id)
        .bind(&donation.stripe_subscription_id)
        .bind(donation.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update donation: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                crate::domain::foundation::ErrorCode::DonationNotFound,
                "Donation not found",
            ));
        }

        Ok(())
    }
}
