//! In-memory donation store.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::donation::Donation;
use crate::domain::foundation::DomainError;
use crate::ports::DonationRepository;

/// Donations held in memory.
#[derive(Default)]
pub struct InMemoryDonationStore {
    donations: Mutex<Vec<Donation>>,
}

impl InMemoryDonationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a donation, for test setup.
    pub fn insert(&self, donation: Donation) {
        self.donations.lock().unwrap().push(donation);
    }

    /// All donations, for test assertions.
    pub fn all(&self) -> Vec<Donation> {
        self.donations.lock().unwrap().clone()
    }
}

#[async_trait]
impl DonationRepository for InMemoryDonationStore {
    async fn find_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<Donation>, DomainError> {
        let donations = self.donations.lock().unwrap();
        Ok(donations
            .iter()
            .find(|d| d.stripe_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Donation>, DomainError> {
        let donations = self.donations.lock().unwrap();
        Ok(donations
            .iter()
            .find(|d| d.stripe_subscription_id.as_deref() == Some(subscription_id))
            .cloned())
    }

    async fn update(&self, donation: &Donation) -> Result<(), DomainError> {
        let mut donations = self.donations.lock().unwrap();
        if let Some(existing) = donations.iter_mut().find(|d| d.id == donation.id) {
            *existing = donation.clone();
        }
        Ok(())
    }
}
