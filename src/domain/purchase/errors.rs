//! Purchase-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | OfferingNotFound / NotFound | 404 |
//! | Forbidden | 403 |
//! | AlreadyPurchased | 409 |
//! | FreeOfferingNotPurchasable | 400 |
//! | CapacityExceeded | 409 |
//! | InvalidState | 409 |
//! | ExternalService | 502 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, OfferingId, PurchaseId};

/// Errors raised by the purchase lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    /// Malformed request input.
    Validation { field: String, message: String },

    /// The referenced offering does not exist.
    OfferingNotFound(OfferingId),

    /// The referenced purchase does not exist.
    NotFound(PurchaseId),

    /// The requester does not own the purchase.
    Forbidden,

    /// The buyer already owns a completed purchase for this offering.
    AlreadyPurchased,

    /// Free offerings never produce purchase records.
    FreeOfferingNotPurchasable,

    /// All class-rep slots for the offering are taken.
    CapacityExceeded,

    /// The requested transition is not legal from the current status.
    InvalidState { current: String, attempted: String },

    /// A processor call failed or timed out.
    ExternalService(String),

    /// Storage or other infrastructure failure.
    Infrastructure(String),
}

impl PurchaseError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PurchaseError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn offering_not_found(id: OfferingId) -> Self {
        PurchaseError::OfferingNotFound(id)
    }

    pub fn not_found(id: PurchaseId) -> Self {
        PurchaseError::NotFound(id)
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        PurchaseError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    /// Guard error for mutation attempts against a completed purchase.
    pub fn cannot_modify_completed(attempted: impl Into<String>) -> Self {
        PurchaseError::InvalidState {
            current: "completed".to_string(),
            attempted: attempted.into(),
        }
    }

    pub fn external(message: impl Into<String>) -> Self {
        PurchaseError::ExternalService(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PurchaseError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PurchaseError::Validation { .. } => ErrorCode::ValidationFailed,
            PurchaseError::OfferingNotFound(_) => ErrorCode::OfferingNotFound,
            PurchaseError::NotFound(_) => ErrorCode::PurchaseNotFound,
            PurchaseError::Forbidden => ErrorCode::Forbidden,
            PurchaseError::AlreadyPurchased => ErrorCode::AlreadyPurchased,
            PurchaseError::FreeOfferingNotPurchasable => ErrorCode::FreeOfferingNotPurchasable,
            PurchaseError::CapacityExceeded => ErrorCode::CapacityExceeded,
            PurchaseError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            PurchaseError::ExternalService(_) => ErrorCode::ExternalServiceError,
            PurchaseError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            PurchaseError::Validation { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            PurchaseError::OfferingNotFound(id) => format!("Offering not found: {}", id),
            PurchaseError::NotFound(id) => format!("Purchase not found: {}", id),
            PurchaseError::Forbidden => "You do not own this purchase".to_string(),
            PurchaseError::AlreadyPurchased => {
                "This offering has already been purchased".to_string()
            }
            PurchaseError::FreeOfferingNotPurchasable => {
                "Free offerings cannot be purchased".to_string()
            }
            PurchaseError::CapacityExceeded => {
                "All class representative slots are taken".to_string()
            }
            PurchaseError::InvalidState { current, attempted } => {
                format!("Cannot {} a purchase in {} state", attempted, current)
            }
            PurchaseError::ExternalService(msg) => {
                format!("Payment processor unavailable: {}", msg)
            }
            PurchaseError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for PurchaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PurchaseError {}

impl From<DomainError> for PurchaseError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => PurchaseError::Validation {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::AlreadyPurchased => PurchaseError::AlreadyPurchased,
            ErrorCode::CapacityExceeded => PurchaseError::CapacityExceeded,
            ErrorCode::ExternalServiceError => PurchaseError::ExternalService(err.message),
            _ => PurchaseError::Infrastructure(err.to_string()),
        }
    }
}

impl From<PurchaseError> for DomainError {
    fn from(err: PurchaseError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
