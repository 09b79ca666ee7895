//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a purchase record.
    PurchaseId
}

uuid_id! {
    /// Unique identifier for a buyer.
    UserId
}

uuid_id! {
    /// Unique identifier for a program.
    ProgramId
}

uuid_id! {
    /// Unique identifier for an event.
    EventId
}

uuid_id! {
    /// Unique identifier for a recurring donation.
    DonationId
}

uuid_id! {
    /// Unique identifier for a recorded billing-cycle transaction.
    TransactionId
}

/// Reference to a purchasable offering: exactly one of program or event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OfferingId {
    Program(ProgramId),
    Event(EventId),
}

impl OfferingId {
    /// Returns the program id, if this references a program.
    pub fn program_id(&self) -> Option<ProgramId> {
        match self {
            OfferingId::Program(id) => Some(*id),
            OfferingId::Event(_) => None,
        }
    }

    /// Returns the event id, if this references an event.
    pub fn event_id(&self) -> Option<EventId> {
        match self {
            OfferingId::Program(_) => None,
            OfferingId::Event(id) => Some(*id),
        }
    }

    /// Returns the raw UUID regardless of kind.
    pub fn as_uuid(&self) -> &Uuid {
        match self {
            OfferingId::Program(id) => id.as_uuid(),
            OfferingId::Event(id) => id.as_uuid(),
        }
    }
}

impl fmt::Display for OfferingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfferingId::Program(id) => write!(f, "program:{}", id),
            OfferingId::Event(id) => write!(f, "event:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(PurchaseId::new(), PurchaseId::new());
        assert_ne!(UserId::new(), UserId::new());
    }

    #[test]
    fn id_roundtrips_through_string() {
        let id = PurchaseId::new();
        let parsed: PurchaseId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn invalid_uuid_fails_to_parse() {
        assert!("not-a-uuid".parse::<UserId>().is_err());
    }

    #[test]
    fn offering_id_exposes_exactly_one_side() {
        let program = OfferingId::Program(ProgramId::new());
        assert!(program.program_id().is_some());
        assert!(program.event_id().is_none());

        let event = OfferingId::Event(EventId::new());
        assert!(event.program_id().is_none());
        assert!(event.event_id().is_some());
    }

    #[test]
    fn offering_id_display_includes_kind() {
        let program = OfferingId::Program(ProgramId::new());
        assert!(program.to_string().starts_with("program:"));

        let event = OfferingId::Event(EventId::new());
        assert!(event.to_string().starts_with("event:"));
    }

    #[test]
    fn offering_id_serializes_with_kind_tag() {
        let id = OfferingId::Program(ProgramId::new());
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.contains("\"kind\":\"program\""));
    }
}
