//! PostgreSQL implementation of ClassRepSlots.
//!
//! Both operations are single `UPDATE` statements whose predicates carry
//! the capacity/floor guard, so the count can never be double-spent or
//! driven negative by concurrent requests.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, OfferingId};
use crate::ports::ClassRepSlots;

/// PostgreSQL implementation of the ClassRepSlots port.
pub struct PostgresClassRepSlots {
    pool: PgPool,
}

impl PostgresClassRepSlots {
    /// Creates a new slot counter with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClassRepSlots for PostgresClassRepSlots {
    async fn reserve(&self, offering: &OfferingId) -> Result<i32, DomainError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE offerings
            SET class_rep_count = class_rep_count + 1
            WHERE id = $1
              AND (class_rep_limit = 0 OR class_rep_count < class_rep_limit)
            RETURNING class_rep_count
            "#,
        )
        .bind(offering.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to reserve class-rep slot: {}", e)))?;

        if let Some((count,)) = row {
            return Ok(count);
        }

        // Distinguish a full offering from a missing one
        let exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM offerings WHERE id = $1")
            .bind(offering.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to look up offering: {}", e)))?;

        if exists.is_some() {
            Err(DomainError::new(
                ErrorCode::CapacityExceeded,
                format!("No class-rep slots left for {}", offering),
            ))
        } else {
            Err(DomainError::new(
                ErrorCode::OfferingNotFound,
                format!("Offering not found: {}", offering),
            ))
        }
    }

    async fn release(&self, offering: &OfferingId) -> Result<i32, DomainError> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE offerings
            SET class_rep_count = class_rep_count - 1
            WHERE id = $1 AND class_rep_count > 0
            RETURNING class_rep_count
            "#,
        )
        .bind(offering.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to release class-rep slot: {}", e)))?;

        match row {
            Some((count,)) => Ok(count),
            // Already at zero (or the offering is gone); the floor holds
            None => Ok(0),
        }
    }
}
