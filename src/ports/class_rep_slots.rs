//! Class-rep slot counter port.
//!
//! The counter is offering-wide shared state contended across users, so
//! every mutation must be one atomic increment/decrement with the
//! capacity guard evaluated in the same step. Implementations must never
//! read the count, check the limit, and then write.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OfferingId};

/// Durable, atomically-updatable class-rep slot counter per offering.
#[async_trait]
pub trait ClassRepSlots: Send + Sync {
    /// Takes one slot and returns the updated count.
    ///
    /// Fails with `ErrorCode::CapacityExceeded` when the offering has a
    /// positive limit and all slots are taken; the check and the
    /// increment happen in one atomic step.
    async fn reserve(&self, offering: &OfferingId) -> Result<i32, DomainError>;

    /// Gives one slot back and returns the updated count.
    ///
    /// The count never goes below zero; releasing at zero is a no-op
    /// that returns zero.
    async fn release(&self, offering: &OfferingId) -> Result<i32, DomainError>;
}
