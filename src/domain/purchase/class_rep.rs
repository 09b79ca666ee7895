//! Net-delta resolution for class-rep slot reservations.
//!
//! The checkout flow is called with the buyer's *desired* class-rep state,
//! not with raw increments. Comparing the desired state against the state
//! already held by the buyer's pending purchase yields a net adjustment of
//! exactly one reservation, one release, or nothing. Repeated identical
//! submissions therefore never double-count a slot.

/// The single slot adjustment a checkout submission may cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotAdjustment {
    /// Take one class-rep slot.
    Reserve,
    /// Give one class-rep slot back.
    Release,
    /// Desired state already holds; touch nothing.
    Keep,
}

impl SlotAdjustment {
    /// The adjustment that undoes this one (used to roll back when a later
    /// step of checkout fails).
    pub fn inverse(&self) -> SlotAdjustment {
        match self {
            SlotAdjustment::Reserve => SlotAdjustment::Release,
            SlotAdjustment::Release => SlotAdjustment::Reserve,
            SlotAdjustment::Keep => SlotAdjustment::Keep,
        }
    }
}

/// Resolves the net slot adjustment for a checkout submission.
///
/// `held` is the class-rep state of the buyer's existing pending purchase
/// for this offering, or `None` when no pending purchase exists yet.
pub fn resolve_slot_adjustment(held: Option<bool>, desired: bool) -> SlotAdjustment {
    match (held, desired) {
        (None, true) => SlotAdjustment::Reserve,
        (None, false) => SlotAdjustment::Keep,
        (Some(true), false) => SlotAdjustment::Release,
        (Some(false), true) => SlotAdjustment::Reserve,
        (Some(true), true) | (Some(false), false) => SlotAdjustment::Keep,
    }
}
