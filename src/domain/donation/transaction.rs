//! Ledger entry for one successfully billed donation cycle.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DonationId, Timestamp, TransactionId};

/// One recorded billing cycle for a recurring donation.
///
/// The `(donation_id, stripe_payment_intent_id)` pair is the idempotency
/// key: the processor may deliver the same billing event several times,
/// and only the first delivery produces a ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationTransaction {
    pub id: TransactionId,
    pub donation_id: DonationId,
    pub stripe_payment_intent_id: String,
    /// Amount actually billed this cycle, minor units.
    pub amount: i64,
    pub currency: String,
    pub paid_at: Timestamp,
}

impl DonationTransaction {
    /// Creates a ledger entry for a billed cycle.
    pub fn new(
        donation_id: DonationId,
        stripe_payment_intent_id: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
        paid_at: Timestamp,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            donation_id,
            stripe_payment_intent_id: stripe_payment_intent_id.into(),
            amount,
            currency: currency.into(),
            paid_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_carries_its_key_pair() {
        let donation_id = DonationId::new();
        let tx = DonationTransaction::new(donation_id, "pi_cycle_1", 1000, "eur", Timestamp::now());
        assert_eq!(tx.donation_id, donation_id);
        assert_eq!(tx.stripe_payment_intent_id, "pi_cycle_1");
        assert_eq!(tx.amount, 1000);
    }
}
