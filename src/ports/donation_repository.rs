//! Recurring donation repository port.

use async_trait::async_trait;

use crate::domain::donation::Donation;
use crate::domain::foundation::DomainError;

/// Durable store for recurring donations.
#[async_trait]
pub trait DonationRepository: Send + Sync {
    /// Finds the donation created by a checkout session.
    async fn find_by_session_id(&self, session_id: &str)
        -> Result<Option<Donation>, DomainError>;

    /// Finds the donation backing a processor subscription.
    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Donation>, DomainError>;

    /// Persists changes to a donation (processor refs attached).
    async fn update(&self, donation: &Donation) -> Result<(), DomainError>;
}
