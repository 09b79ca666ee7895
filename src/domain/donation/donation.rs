//! Recurring donation entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DonationId, Timestamp, UserId};

/// A recurring donation backed by a processor subscription.
///
/// Created by the donation checkout surface (outside this crate's core);
/// the webhook reconciler attaches processor identifiers once the
/// subscription checkout completes and records one transaction per billed
/// cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub user_id: UserId,
    /// Amount billed per cycle, minor units.
    pub amount: i64,
    pub currency: String,
    /// Checkout session that created the subscription.
    pub stripe_session_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Donation {
    /// Attaches processor identifiers learned from the subscription
    /// checkout event. Idempotent: already-set identifiers are kept, so a
    /// redelivered event changes nothing.
    pub fn attach_processor_refs(
        &mut self,
        customer_id: Option<String>,
        subscription_id: Option<String>,
        now: Timestamp,
    ) {
        let mut changed = false;
        if self.stripe_customer_id.is_none() && customer_id.is_some() {
            self.stripe_customer_id = customer_id;
            changed = true;
        }
        if self.stripe_subscription_id.is_none() && subscription_id.is_some() {
            self.stripe_subscription_id = subscription_id;
            changed = true;
        }
        if changed {
            self.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn donation() -> Donation {
        let now = Timestamp::now();
        Donation {
            id: DonationId::new(),
            user_id: UserId::new(),
            amount: 1000,
            currency: "eur".to_string(),
            stripe_session_id: Some("cs_donation_1".to_string()),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn attach_sets_both_identifiers() {
        let mut d = donation();
        d.attach_processor_refs(
            Some("cus_1".to_string()),
            Some("sub_1".to_string()),
            Timestamp::now(),
        );
        assert_eq!(d.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(d.stripe_subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn attach_is_idempotent() {
        let mut d = donation();
        d.attach_processor_refs(
            Some("cus_1".to_string()),
            Some("sub_1".to_string()),
            Timestamp::now(),
        );
        d.attach_processor_refs(
            Some("cus_other".to_string()),
            Some("sub_other".to_string()),
            Timestamp::now(),
        );
        assert_eq!(d.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(d.stripe_subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn attach_with_nothing_changes_nothing() {
        let mut d = donation();
        let before = d.updated_at;
        d.attach_processor_refs(None, None, before.add_hours(1));
        assert_eq!(d.updated_at, before);
    }
}
