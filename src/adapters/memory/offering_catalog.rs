//! In-memory offering catalog.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, OfferingId};
use crate::domain::purchase::Offering;
use crate::ports::OfferingCatalog;

/// Fixed catalog of offerings, seeded by tests or local setup.
#[derive(Default)]
pub struct InMemoryOfferingCatalog {
    offerings: Mutex<Vec<Offering>>,
}

impl InMemoryOfferingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an offering to the catalog.
    pub fn insert(&self, offering: Offering) {
        self.offerings.lock().unwrap().push(offering);
    }
}

#[async_trait]
impl OfferingCatalog for InMemoryOfferingCatalog {
    async fn find(&self, id: &OfferingId) -> Result<Option<Offering>, DomainError> {
        let offerings = self.offerings.lock().unwrap();
        Ok(offerings.iter().find(|o| &o.id == id).cloned())
    }
}
