//! Purchase status state machine.
//!
//! A purchase attempt starts `pending` and ends in exactly one terminal
//! state. Terminal states never transition again; the idempotent
//! "complete an already-completed purchase" case is resolved by the
//! reconciler treating it as a successful no-op, not by a self-transition.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Awaiting payment completion at the external processor.
    Pending,

    /// Payment confirmed; the buyer owns the offering.
    Completed,

    /// The processor reported the payment attempt failed.
    Failed,

    /// The buyer abandoned the attempt explicitly.
    Cancelled,
}

impl PurchaseStatus {
    /// Returns true once the attempt can no longer change state.
    pub fn is_final(&self) -> bool {
        !matches!(self, PurchaseStatus::Pending)
    }

    /// Stable wire/database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Failed => "failed",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }

    /// Parses the stable representation produced by [`as_str`](Self::as_str).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PurchaseStatus::Pending),
            "completed" => Some(PurchaseStatus::Completed),
            "failed" => Some(PurchaseStatus::Failed),
            "cancelled" => Some(PurchaseStatus::Cancelled),
            _ => None,
        }
    }
}

impl StateMachine for PurchaseStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PurchaseStatus::*;
        matches!(
            (self, target),
            (Pending, Completed) | (Pending, Failed) | (Pending, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PurchaseStatus::*;
        match self {
            Pending => vec![Completed, Failed, Cancelled],
            Completed | Failed | Cancelled => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_complete() {
        let status = PurchaseStatus::Pending;
        assert!(status.can_transition_to(&PurchaseStatus::Completed));
        assert_eq!(
            status.transition_to(PurchaseStatus::Completed),
            Ok(PurchaseStatus::Completed)
        );
    }

    #[test]
    fn pending_can_fail() {
        assert!(PurchaseStatus::Pending.can_transition_to(&PurchaseStatus::Failed));
    }

    #[test]
    fn pending_can_cancel() {
        assert!(PurchaseStatus::Pending.can_transition_to(&PurchaseStatus::Cancelled));
    }

    #[test]
    fn completed_is_terminal() {
        let status = PurchaseStatus::Completed;
        assert!(status.is_terminal());
        assert!(status.transition_to(PurchaseStatus::Failed).is_err());
        assert!(status.transition_to(PurchaseStatus::Cancelled).is_err());
    }

    #[test]
    fn failed_is_terminal() {
        assert!(PurchaseStatus::Failed.is_terminal());
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(PurchaseStatus::Cancelled.is_terminal());
    }

    #[test]
    fn only_pending_is_non_final() {
        assert!(!PurchaseStatus::Pending.is_final());
        assert!(PurchaseStatus::Completed.is_final());
        assert!(PurchaseStatus::Failed.is_final());
        assert!(PurchaseStatus::Cancelled.is_final());
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            PurchaseStatus::Pending,
            PurchaseStatus::Completed,
            PurchaseStatus::Failed,
            PurchaseStatus::Cancelled,
        ] {
            assert_eq!(PurchaseStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        assert_eq!(PurchaseStatus::parse("refunded"), None);
    }
}
