//! Purchase aggregate.
//!
//! One record per checkout attempt, keyed internally by [`PurchaseId`] and
//! externally by an [`OrderNumber`] and the processor's session id. The
//! aggregate enforces the lifecycle rules; uniqueness across records (one
//! completed purchase per buyer and offering, one pending attempt at a
//! time) is enforced by the repository and its constraints.

use serde::{Deserialize, Serialize};

use super::errors::PurchaseError;
use super::order_number::OrderNumber;
use super::pricing::PriceQuote;
use super::status::PurchaseStatus;
use crate::domain::foundation::{OfferingId, PurchaseId, Timestamp, UserId};

/// Payment-method snapshot captured from the processor at completion.
///
/// Write-once: populated fields are never blank-overwritten by later
/// duplicate events for the same record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub cardholder_name: Option<String>,
    pub card_brand: Option<String>,
    pub card_last4: Option<String>,
    pub billing_address: Option<String>,
}

impl BillingDetails {
    /// True when no field has been captured yet.
    pub fn is_empty(&self) -> bool {
        self.cardholder_name.is_none()
            && self.card_brand.is_none()
            && self.card_last4.is_none()
            && self.billing_address.is_none()
    }

    /// Fills only the fields that are still unset.
    pub fn merge_absent(&mut self, other: &BillingDetails) {
        if self.cardholder_name.is_none() {
            self.cardholder_name = other.cardholder_name.clone();
        }
        if self.card_brand.is_none() {
            self.card_brand = other.card_brand.clone();
        }
        if self.card_last4.is_none() {
            self.card_last4 = other.card_last4.clone();
        }
        if self.billing_address.is_none() {
            self.billing_address = other.billing_address.clone();
        }
    }
}

/// One purchase attempt for one offering by one buyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub offering: OfferingId,
    pub pricing: PriceQuote,
    pub status: PurchaseStatus,
    pub stripe_session_id: String,
    pub stripe_payment_intent_id: Option<String>,
    /// Set exactly once, on the transition into `completed`.
    pub purchase_date: Option<Timestamp>,
    pub billing: BillingDetails,
    pub created_at: Timestamp,
    /// Bumped on retry; the housekeeper's 24-hour window is measured
    /// against this, so an actively retried attempt is not "abandoned".
    pub updated_at: Timestamp,
}

impl Purchase {
    /// Creates a fresh pending purchase for a checkout attempt.
    pub fn new_pending(
        user_id: UserId,
        offering: OfferingId,
        pricing: PriceQuote,
        stripe_session_id: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PurchaseId::new(),
            order_number: OrderNumber::generate(now),
            user_id,
            offering,
            pricing,
            status: PurchaseStatus::Pending,
            stripe_session_id: stripe_session_id.into(),
            stripe_payment_intent_id: None,
            purchase_date: None,
            billing: BillingDetails::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True if the given user owns this purchase.
    pub fn owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Replaces the checkout session for a retried or re-submitted
    /// pending attempt, re-snapshotting the price.
    pub fn refresh_session(
        &mut self,
        stripe_session_id: impl Into<String>,
        pricing: PriceQuote,
        now: Timestamp,
    ) -> Result<(), PurchaseError> {
        if self.status != PurchaseStatus::Pending {
            return Err(PurchaseError::invalid_state(
                self.status.as_str(),
                "restart checkout for",
            ));
        }
        self.stripe_session_id = stripe_session_id.into();
        self.pricing = pricing;
        self.updated_at = now;
        Ok(())
    }

    /// Marks the purchase completed.
    ///
    /// Idempotent: completing an already-completed purchase is a no-op
    /// success, as required for at-least-once webhook delivery. Failed and
    /// cancelled attempts can no longer complete.
    pub fn complete(
        &mut self,
        payment_intent_id: Option<String>,
        now: Timestamp,
    ) -> Result<(), PurchaseError> {
        match self.status {
            PurchaseStatus::Completed => Ok(()),
            PurchaseStatus::Pending => {
                self.status = PurchaseStatus::Completed;
                self.purchase_date = Some(now);
                if self.stripe_payment_intent_id.is_none() {
                    self.stripe_payment_intent_id = payment_intent_id;
                }
                self.updated_at = now;
                Ok(())
            }
            PurchaseStatus::Failed | PurchaseStatus::Cancelled => Err(
                PurchaseError::invalid_state(self.status.as_str(), "complete"),
            ),
        }
    }

    /// Marks the payment attempt failed.
    ///
    /// Idempotent on already-failed records. Completed purchases reject
    /// the transition.
    pub fn fail(&mut self, now: Timestamp) -> Result<(), PurchaseError> {
        match self.status {
            PurchaseStatus::Failed => Ok(()),
            PurchaseStatus::Pending => {
                self.status = PurchaseStatus::Failed;
                self.updated_at = now;
                Ok(())
            }
            PurchaseStatus::Completed => {
                Err(PurchaseError::cannot_modify_completed("fail"))
            }
            PurchaseStatus::Cancelled => Err(PurchaseError::invalid_state(
                self.status.as_str(),
                "fail",
            )),
        }
    }

    /// Captures payment-method details, never overwriting populated fields.
    pub fn record_billing(&mut self, details: &BillingDetails, now: Timestamp) {
        let before = self.billing.clone();
        self.billing.merge_absent(details);
        if self.billing != before {
            self.updated_at = now;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{pending_purchase, quote};
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Creation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn new_pending_starts_in_pending_state() {
        let purchase = pending_purchase();
        assert_eq!(purchase.status, PurchaseStatus::Pending);
        assert!(purchase.purchase_date.is_none());
        assert!(purchase.stripe_payment_intent_id.is_none());
        assert!(purchase.billing.is_empty());
    }

    #[test]
    fn new_pending_mints_an_order_number() {
        let purchase = pending_purchase();
        assert!(purchase.order_number.as_str().starts_with("ORD-"));
    }

    // ══════════════════════════════════════════════════════════════
    // Session Refresh
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn refresh_session_replaces_session_and_price() {
        let mut purchase = pending_purchase();
        let later = purchase.created_at.add_hours(1);

        purchase
            .refresh_session("cs_test_456", quote(1500), later)
            .unwrap();

        assert_eq!(purchase.stripe_session_id, "cs_test_456");
        assert_eq!(purchase.pricing.final_price, 1500);
        assert_eq!(purchase.updated_at, later);
        // creation time is history, not the expiry anchor
        assert!(purchase.created_at.is_before(&purchase.updated_at));
    }

    #[test]
    fn refresh_session_rejects_completed() {
        let mut purchase = pending_purchase();
        purchase.complete(None, Timestamp::now()).unwrap();

        let result = purchase.refresh_session("cs_new", quote(1500), Timestamp::now());
        assert!(matches!(result, Err(PurchaseError::InvalidState { .. })));
    }

    // ══════════════════════════════════════════════════════════════
    // Completion
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn complete_sets_purchase_date_and_intent() {
        let mut purchase = pending_purchase();
        let now = Timestamp::now();

        purchase.complete(Some("pi_123".to_string()), now).unwrap();

        assert_eq!(purchase.status, PurchaseStatus::Completed);
        assert_eq!(purchase.purchase_date, Some(now));
        assert_eq!(purchase.stripe_payment_intent_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn complete_twice_is_a_noop_success() {
        let mut purchase = pending_purchase();
        let first = Timestamp::now();
        purchase.complete(Some("pi_123".to_string()), first).unwrap();

        let second = first.add_hours(1);
        purchase.complete(Some("pi_999".to_string()), second).unwrap();

        // Nothing from the duplicate event sticks
        assert_eq!(purchase.purchase_date, Some(first));
        assert_eq!(purchase.stripe_payment_intent_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn complete_after_failure_is_rejected() {
        let mut purchase = pending_purchase();
        purchase.fail(Timestamp::now()).unwrap();

        let result = purchase.complete(None, Timestamp::now());
        assert!(matches!(result, Err(PurchaseError::InvalidState { .. })));
    }

    #[test]
    fn complete_keeps_existing_payment_intent() {
        let mut purchase = pending_purchase();
        purchase.stripe_payment_intent_id = Some("pi_original".to_string());

        purchase
            .complete(Some("pi_other".to_string()), Timestamp::now())
            .unwrap();

        assert_eq!(
            purchase.stripe_payment_intent_id.as_deref(),
            Some("pi_original")
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Failure
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn fail_moves_pending_to_failed() {
        let mut purchase = pending_purchase();
        purchase.fail(Timestamp::now()).unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Failed);
    }

    #[test]
    fn fail_twice_is_a_noop_success() {
        let mut purchase = pending_purchase();
        purchase.fail(Timestamp::now()).unwrap();
        assert!(purchase.fail(Timestamp::now()).is_ok());
    }

    #[test]
    fn fail_rejects_completed_purchase() {
        let mut purchase = pending_purchase();
        purchase.complete(None, Timestamp::now()).unwrap();

        let result = purchase.fail(Timestamp::now());
        assert!(matches!(
            result,
            Err(PurchaseError::InvalidState { ref current, .. }) if current == "completed"
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Billing Snapshot
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn record_billing_fills_empty_fields() {
        let mut purchase = pending_purchase();
        let details = BillingDetails {
            cardholder_name: Some("Ada Lovelace".to_string()),
            card_brand: Some("visa".to_string()),
            card_last4: Some("4242".to_string()),
            billing_address: None,
        };

        purchase.record_billing(&details, Timestamp::now());

        assert_eq!(purchase.billing.card_brand.as_deref(), Some("visa"));
        assert_eq!(purchase.billing.card_last4.as_deref(), Some("4242"));
    }

    #[test]
    fn record_billing_never_overwrites_populated_fields() {
        let mut purchase = pending_purchase();
        purchase.record_billing(
            &BillingDetails {
                cardholder_name: Some("Ada Lovelace".to_string()),
                card_brand: Some("visa".to_string()),
                card_last4: Some("4242".to_string()),
                billing_address: Some("10 Downing St".to_string()),
            },
            Timestamp::now(),
        );

        // A later duplicate event carries different (or empty) details
        purchase.record_billing(
            &BillingDetails {
                cardholder_name: None,
                card_brand: Some("mastercard".to_string()),
                card_last4: Some("9999".to_string()),
                billing_address: None,
            },
            Timestamp::now(),
        );

        assert_eq!(purchase.billing.card_brand.as_deref(), Some("visa"));
        assert_eq!(purchase.billing.card_last4.as_deref(), Some("4242"));
        assert_eq!(
            purchase.billing.cardholder_name.as_deref(),
            Some("Ada Lovelace")
        );
    }

    #[test]
    fn ownership_check() {
        let purchase = pending_purchase();
        assert!(purchase.owned_by(&purchase.user_id));
        assert!(!purchase.owned_by(&UserId::new()));
    }
}
