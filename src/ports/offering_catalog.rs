//! Offering lookup port.
//!
//! The program/event catalog is owned elsewhere; checkout only needs the
//! pricing and capacity snapshot for a single offering.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OfferingId};
use crate::domain::purchase::Offering;

/// Lookup access to purchasable offerings.
#[async_trait]
pub trait OfferingCatalog: Send + Sync {
    /// Fetches the offering's pricing and capacity configuration.
    async fn find(&self, id: &OfferingId) -> Result<Option<Offering>, DomainError>;
}
