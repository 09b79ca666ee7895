//! In-memory donation transaction ledger.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::donation::DonationTransaction;
use crate::domain::foundation::DomainError;
use crate::ports::{LedgerOutcome, TransactionLedger};

/// Ledger entries held in memory. The uniqueness check and the append
/// happen under one lock, mirroring the database constraint.
#[derive(Default)]
pub struct InMemoryTransactionLedger {
    entries: Mutex<Vec<DonationTransaction>>,
}

impl InMemoryTransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries, for test assertions.
    pub fn all(&self) -> Vec<DonationTransaction> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionLedger for InMemoryTransactionLedger {
    async fn record(&self, tx: &DonationTransaction) -> Result<LedgerOutcome, DomainError> {
        let mut entries = self.entries.lock().unwrap();
        let duplicate = entries.iter().any(|e| {
            e.donation_id == tx.donation_id
                && e.stripe_payment_intent_id == tx.stripe_payment_intent_id
        });
        if duplicate {
            return Ok(LedgerOutcome::DuplicateCycle);
        }
        entries.push(tx.clone());
        Ok(LedgerOutcome::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DonationId, Timestamp};

    #[tokio::test]
    async fn same_pair_records_once() {
        let ledger = InMemoryTransactionLedger::new();
        let donation_id = DonationId::new();

        let first =
            DonationTransaction::new(donation_id, "pi_cycle_1", 1000, "eur", Timestamp::now());
        let second =
            DonationTransaction::new(donation_id, "pi_cycle_1", 1000, "eur", Timestamp::now());

        assert_eq!(ledger.record(&first).await.unwrap(), LedgerOutcome::Recorded);
        assert_eq!(
            ledger.record(&second).await.unwrap(),
            LedgerOutcome::DuplicateCycle
        );
        assert_eq!(ledger.all().len(), 1);
    }

    #[tokio::test]
    async fn different_cycles_record_separately() {
        let ledger = InMemoryTransactionLedger::new();
        let donation_id = DonationId::new();

        let first =
            DonationTransaction::new(donation_id, "pi_cycle_1", 1000, "eur", Timestamp::now());
        let second =
            DonationTransaction::new(donation_id, "pi_cycle_2", 1000, "eur", Timestamp::now());

        assert_eq!(ledger.record(&first).await.unwrap(), LedgerOutcome::Recorded);
        assert_eq!(ledger.record(&second).await.unwrap(), LedgerOutcome::Recorded);
        assert_eq!(ledger.all().len(), 2);
    }
}
