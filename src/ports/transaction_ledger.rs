//! Donation transaction ledger port.

use async_trait::async_trait;

use crate::domain::donation::DonationTransaction;
use crate::domain::foundation::DomainError;

/// Result of recording a billed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// A new ledger entry was written.
    Recorded,
    /// An entry for this `(donation, payment intent)` pair already
    /// exists; the redelivered event changed nothing.
    DuplicateCycle,
}

/// Append-only ledger of successfully billed donation cycles.
///
/// Uniqueness of `(donation_id, stripe_payment_intent_id)` is the
/// idempotency guard and must be enforced by a storage constraint, not a
/// prior read.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    /// Records one billed cycle, exactly once per payment intent.
    async fn record(&self, tx: &DonationTransaction) -> Result<LedgerOutcome, DomainError>;
}
