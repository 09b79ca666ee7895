//! In-memory purchase store.
//!
//! Implements both the repository and the read side. All guard predicates
//! are evaluated under the same lock as the write, mirroring the atomic
//! conditional updates of the PostgreSQL adapter.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::domain::foundation::{
    DomainError, ErrorCode, OfferingId, PurchaseId, Timestamp, UserId,
};
use crate::domain::purchase::{BillingDetails, Purchase, PurchaseStatus};
use crate::ports::{
    CompletionOutcome, FailureOutcome, OfferingCatalog, PendingPurchaseView, PurchaseReader,
    PurchaseRepository,
};

/// Purchase records held in memory.
pub struct InMemoryPurchaseStore {
    catalog: Arc<dyn OfferingCatalog>,
    records: Mutex<Vec<Purchase>>,
}

impl InMemoryPurchaseStore {
    pub fn new(catalog: Arc<dyn OfferingCatalog>) -> Self {
        Self {
            catalog,
            records: Mutex::new(Vec::new()),
        }
    }

    /// All records, for test assertions.
    pub fn all(&self) -> Vec<Purchase> {
        self.records.lock().unwrap().clone()
    }

    /// Inserts bypassing the completed-sibling guard, for test setup.
    pub fn insert_raw(&self, purchase: Purchase) {
        self.records.lock().unwrap().push(purchase);
    }

    fn storage_err(msg: &str) -> DomainError {
        DomainError::new(ErrorCode::DatabaseError, msg.to_string())
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryPurchaseStore {
    async fn insert(&self, purchase: &Purchase) -> Result<(), DomainError> {
        let mut records = self.records.lock().unwrap();
        let completed_exists = records.iter().any(|p| {
            p.user_id == purchase.user_id
                && p.offering == purchase.offering
                && p.status == PurchaseStatus::Completed
        });
        if completed_exists {
            return Err(DomainError::new(
                ErrorCode::AlreadyPurchased,
                "A completed purchase already exists for this offering",
            ));
        }
        records.push(purchase.clone());
        Ok(())
    }

    async fn update_pending(&self, purchase: &Purchase) -> Result<bool, DomainError> {
        let mut records = self.records.lock().unwrap();
        match records
            .iter_mut()
            .find(|p| p.id == purchase.id && p.status == PurchaseStatus::Pending)
        {
            Some(existing) => {
                *existing = purchase.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_id(&self, id: &PurchaseId) -> Result<Option<Purchase>, DomainError> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().find(|p| &p.id == id).cloned())
    }

    async fn find_pending_for_offering(
        &self,
        user_id: &UserId,
        offering: &OfferingId,
    ) -> Result<Option<Purchase>, DomainError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .find(|p| {
                &p.user_id == user_id
                    && &p.offering == offering
                    && p.status == PurchaseStatus::Pending
            })
            .cloned())
    }

    async fn completed_exists(
        &self,
        user_id: &UserId,
        offering: &OfferingId,
    ) -> Result<bool, DomainError> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().any(|p| {
            &p.user_id == user_id
                && &p.offering == offering
                && p.status == PurchaseStatus::Completed
        }))
    }

    async fn complete_by_session(
        &self,
        session_id: &str,
        payment_intent_id: Option<&str>,
        completed_at: Timestamp,
    ) -> Result<CompletionOutcome, DomainError> {
        let mut records = self.records.lock().unwrap();
        let Some(purchase) = records
            .iter_mut()
            .find(|p| p.stripe_session_id == session_id)
        else {
            return Ok(CompletionOutcome::NotFound);
        };

        match purchase.status {
            PurchaseStatus::Completed => Ok(CompletionOutcome::AlreadyCompleted(purchase.clone())),
            PurchaseStatus::Pending => {
                purchase
                    .complete(payment_intent_id.map(str::to_string), completed_at)
                    .map_err(|e| Self::storage_err(&e.to_string()))?;
                Ok(CompletionOutcome::Completed(purchase.clone()))
            }
            // Terminal non-completed records are not completable
            _ => Ok(CompletionOutcome::NotFound),
        }
    }

    async fn complete_by_payment_intent(
        &self,
        payment_intent_id: &str,
        completed_at: Timestamp,
    ) -> Result<CompletionOutcome, DomainError> {
        let mut records = self.records.lock().unwrap();
        let Some(purchase) = records
            .iter_mut()
            .find(|p| p.stripe_payment_intent_id.as_deref() == Some(payment_intent_id))
        else {
            return Ok(CompletionOutcome::NotFound);
        };

        match purchase.status {
            PurchaseStatus::Completed => Ok(CompletionOutcome::AlreadyCompleted(purchase.clone())),
            PurchaseStatus::Pending => {
                purchase
                    .complete(Some(payment_intent_id.to_string()), completed_at)
                    .map_err(|e| Self::storage_err(&e.to_string()))?;
                Ok(CompletionOutcome::Completed(purchase.clone()))
            }
            _ => Ok(CompletionOutcome::NotFound),
        }
    }

    async fn record_billing_details(
        &self,
        id: &PurchaseId,
        details: &BillingDetails,
    ) -> Result<(), DomainError> {
        let mut records = self.records.lock().unwrap();
        if let Some(purchase) = records.iter_mut().find(|p| &p.id == id) {
            purchase.record_billing(details, Timestamp::now());
        }
        Ok(())
    }

    async fn fail_by_payment_intent(
        &self,
        payment_intent_id: &str,
        failed_at: Timestamp,
    ) -> Result<FailureOutcome, DomainError> {
        let mut records = self.records.lock().unwrap();
        let Some(purchase) = records
            .iter_mut()
            .find(|p| p.stripe_payment_intent_id.as_deref() == Some(payment_intent_id))
        else {
            return Ok(FailureOutcome::NotFound);
        };

        match purchase.status {
            PurchaseStatus::Pending => {
                purchase
                    .fail(failed_at)
                    .map_err(|e| Self::storage_err(&e.to_string()))?;
                Ok(FailureOutcome::Failed(purchase.clone()))
            }
            _ => Ok(FailureOutcome::AlreadyTerminal),
        }
    }

    async fn delete_pending(&self, id: &PurchaseId) -> Result<bool, DomainError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|p| !(p.id == *id && p.status == PurchaseStatus::Pending));
        Ok(records.len() < before)
    }

    async fn purge_expired_pending(
        &self,
        user_id: &UserId,
        cutoff: Timestamp,
    ) -> Result<u64, DomainError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|p| {
            !(p.user_id == *user_id
                && p.status == PurchaseStatus::Pending
                && p.updated_at.is_before(&cutoff))
        });
        Ok((before - records.len()) as u64)
    }

    async fn purge_superseded_pending(&self, user_id: &UserId) -> Result<u64, DomainError> {
        let mut records = self.records.lock().unwrap();
        let completed: Vec<OfferingId> = records
            .iter()
            .filter(|p| p.user_id == *user_id && p.status == PurchaseStatus::Completed)
            .map(|p| p.offering)
            .collect();

        let before = records.len();
        records.retain(|p| {
            !(p.user_id == *user_id
                && p.status == PurchaseStatus::Pending
                && completed.contains(&p.offering))
        });
        Ok((before - records.len()) as u64)
    }
}

#[async_trait]
impl PurchaseReader for InMemoryPurchaseStore {
    async fn list_pending(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<PendingPurchaseView>, DomainError> {
        let mut pending: Vec<Purchase> = {
            let records = self.records.lock().unwrap();
            records
                .iter()
                .filter(|p| &p.user_id == user_id && p.status == PurchaseStatus::Pending)
                .cloned()
                .collect()
        };
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut views = Vec::with_capacity(pending.len());
        for purchase in pending {
            let offering = self.catalog.find(&purchase.offering).await?;
            let (title, currency) = offering
                .map(|o| (o.title, o.currency))
                .unwrap_or_else(|| ("(removed offering)".to_string(), "eur".to_string()));
            views.push(PendingPurchaseView {
                id: purchase.id,
                order_number: purchase.order_number.clone(),
                offering: purchase.offering,
                offering_title: title,
                final_price: purchase.pricing.final_price,
                currency,
                is_class_rep: purchase.pricing.is_class_rep,
                created_at: purchase.created_at,
            });
        }
        Ok(views)
    }
}
