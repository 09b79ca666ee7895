//! Purchase repository port.
//!
//! Every mutating operation here is specified as a single atomic
//! conditional update: the status predicate is evaluated in the same
//! statement as the write, so concurrent requests for the same record
//! (double-clicks, parallel webhook deliveries) cannot produce lost
//! updates. Implementations must not use separate read-then-write.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OfferingId, PurchaseId, Timestamp, UserId};
use crate::domain::purchase::{BillingDetails, Purchase};

/// Result of an atomic completion attempt.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// The record moved from `pending` to `completed` in this call.
    Completed(Purchase),
    /// The record was already `completed`; nothing changed.
    AlreadyCompleted(Purchase),
    /// No record matches the identifier (cleaned up, foreign event, or a
    /// race with the housekeeper).
    NotFound,
}

/// Result of an atomic failure-marking attempt.
#[derive(Debug, Clone)]
pub enum FailureOutcome {
    /// The record moved from `pending` to `failed` in this call.
    Failed(Purchase),
    /// The record is already in a terminal state; nothing changed.
    AlreadyTerminal,
    /// No record matches the payment intent.
    NotFound,
}

/// Durable store for purchase records.
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// Inserts a fresh pending purchase.
    ///
    /// Fails with `ErrorCode::AlreadyPurchased` when a completed record
    /// already exists for the same buyer and offering (backed by a
    /// storage constraint, not a prior read).
    async fn insert(&self, purchase: &Purchase) -> Result<(), DomainError>;

    /// Persists a refreshed pending purchase (new session id, new price
    /// snapshot), guarded on the record still being `pending`.
    ///
    /// Returns `false` when the record is no longer pending (a webhook
    /// finalized it concurrently) and nothing was written.
    async fn update_pending(&self, purchase: &Purchase) -> Result<bool, DomainError>;

    async fn find_by_id(&self, id: &PurchaseId) -> Result<Option<Purchase>, DomainError>;

    /// The buyer's current pending attempt for an offering, if any.
    /// At most one exists at any time.
    async fn find_pending_for_offering(
        &self,
        user_id: &UserId,
        offering: &OfferingId,
    ) -> Result<Option<Purchase>, DomainError>;

    /// Whether a completed purchase exists for the buyer and offering.
    async fn completed_exists(
        &self,
        user_id: &UserId,
        offering: &OfferingId,
    ) -> Result<bool, DomainError>;

    /// Atomically completes the pending record holding this checkout
    /// session id, storing the payment intent id if not yet known.
    async fn complete_by_session(
        &self,
        session_id: &str,
        payment_intent_id: Option<&str>,
        completed_at: Timestamp,
    ) -> Result<CompletionOutcome, DomainError>;

    /// Atomically completes the pending record holding this payment
    /// intent id.
    async fn complete_by_payment_intent(
        &self,
        payment_intent_id: &str,
        completed_at: Timestamp,
    ) -> Result<CompletionOutcome, DomainError>;

    /// Writes payment-method details captured at completion. Populated
    /// fields are preserved; only absent fields are filled.
    async fn record_billing_details(
        &self,
        id: &PurchaseId,
        details: &BillingDetails,
    ) -> Result<(), DomainError>;

    /// Atomically marks the pending record holding this payment intent
    /// as failed.
    async fn fail_by_payment_intent(
        &self,
        payment_intent_id: &str,
        failed_at: Timestamp,
    ) -> Result<FailureOutcome, DomainError>;

    /// Hard-deletes a record, guarded on it still being `pending`.
    /// Returns `false` when nothing was deleted.
    async fn delete_pending(&self, id: &PurchaseId) -> Result<bool, DomainError>;

    /// Hard-deletes the buyer's pending records last touched before the
    /// cutoff. Returns the number of deleted rows.
    async fn purge_expired_pending(
        &self,
        user_id: &UserId,
        cutoff: Timestamp,
    ) -> Result<u64, DomainError>;

    /// Hard-deletes the buyer's pending records whose offering already
    /// has a completed sibling record. Returns the number of deleted rows.
    async fn purge_superseded_pending(&self, user_id: &UserId) -> Result<u64, DomainError>;
}
