//! Request/response DTOs for the checkout endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{EventId, OfferingId, ProgramId};
use crate::domain::purchase::PurchaseError;
use crate::ports::PendingPurchaseView;

/// POST /api/checkout request body.
#[derive(Debug, Deserialize)]
pub struct StartCheckoutRequest {
    /// "program" or "event".
    pub offering_kind: String,
    pub offering_id: Uuid,
    #[serde(default)]
    pub is_class_rep: bool,
    #[serde(default)]
    pub promo_code: Option<String>,
}

impl StartCheckoutRequest {
    /// Resolves the typed offering reference.
    pub fn offering(&self) -> Result<OfferingId, PurchaseError> {
        match self.offering_kind.as_str() {
            "program" => Ok(OfferingId::Program(ProgramId::from_uuid(self.offering_id))),
            "event" => Ok(OfferingId::Event(EventId::from_uuid(self.offering_id))),
            other => Err(PurchaseError::validation(
                "offering_kind",
                format!("must be 'program' or 'event', got '{}'", other),
            )),
        }
    }
}

/// Redirect payload returned by checkout and retry.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub purchase_id: Uuid,
    pub order_number: String,
    pub redirect_url: String,
}

/// One pending purchase in the listing.
#[derive(Debug, Serialize)]
pub struct PendingPurchaseResponse {
    pub purchase_id: Uuid,
    pub order_number: String,
    pub offering_kind: String,
    pub offering_id: Uuid,
    pub offering_title: String,
    pub final_price: i64,
    pub currency: String,
    pub is_class_rep: bool,
    pub created_at: String,
}

impl From<PendingPurchaseView> for PendingPurchaseResponse {
    fn from(view: PendingPurchaseView) -> Self {
        let (offering_kind, offering_id) = match view.offering {
            OfferingId::Program(id) => ("program", *id.as_uuid()),
            OfferingId::Event(id) => ("event", *id.as_uuid()),
        };
        Self {
            purchase_id: *view.id.as_uuid(),
            order_number: view.order_number.to_string(),
            offering_kind: offering_kind.to_string(),
            offering_id,
            offering_title: view.offering_title,
            final_price: view.final_price,
            currency: view.currency,
            is_class_rep: view.is_class_rep,
            created_at: view.created_at.to_string(),
        }
    }
}

/// GET /api/purchases/pending response body.
#[derive(Debug, Serialize)]
pub struct PendingPurchasesResponse {
    pub purchases: Vec<PendingPurchaseResponse>,
}

/// Standard error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
