//! In-memory class-rep slot counter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, OfferingId};
use crate::ports::{ClassRepSlots, OfferingCatalog};

/// Slot counter keyed by offering, with limits resolved from the catalog.
///
/// The capacity check and the increment happen under one lock, matching
/// the atomic-update contract of the port.
pub struct InMemoryClassRepSlots {
    catalog: Arc<dyn OfferingCatalog>,
    counts: Mutex<HashMap<Uuid, i32>>,
}

impl InMemoryClassRepSlots {
    pub fn new(catalog: Arc<dyn OfferingCatalog>) -> Self {
        Self {
            catalog,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Current reservation count for an offering (zero if untouched).
    pub fn count(&self, offering: &OfferingId) -> i32 {
        *self
            .counts
            .lock()
            .unwrap()
            .get(offering.as_uuid())
            .unwrap_or(&0)
    }
}

#[async_trait]
impl ClassRepSlots for InMemoryClassRepSlots {
    async fn reserve(&self, offering: &OfferingId) -> Result<i32, DomainError> {
        let limit = self
            .catalog
            .find(offering)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::OfferingNotFound,
                    format!("Offering not found: {}", offering),
                )
            })?
            .class_rep_limit;

        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(*offering.as_uuid()).or_insert(0);
        if limit > 0 && *count >= limit {
            return Err(DomainError::new(
                ErrorCode::CapacityExceeded,
                format!("No class-rep slots left for {}", offering),
            ));
        }
        *count += 1;
        Ok(*count)
    }

    async fn release(&self, offering: &OfferingId) -> Result<i32, DomainError> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(*offering.as_uuid()).or_insert(0);
        if *count > 0 {
            *count -= 1;
        }
        Ok(*count)
    }
}
