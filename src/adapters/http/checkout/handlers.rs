//! HTTP handlers for the checkout and webhook endpoints.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers. The webhook route receives the raw request bytes so
//! signature verification sees exactly what the processor signed.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::handlers::checkout::{
    CancelPurchaseCommand, CancelPurchaseHandler, ListPendingPurchasesHandler,
    ListPendingPurchasesQuery, RetryPurchaseCommand, RetryPurchaseHandler, StartCheckoutCommand,
    StartCheckoutHandler,
};
use crate::application::handlers::webhook::{
    ProcessStripeWebhookCommand, ProcessStripeWebhookHandler,
};
use crate::config::CheckoutConfig;
use crate::domain::foundation::{PurchaseId, UserId};
use crate::domain::purchase::PurchaseError;
use crate::domain::webhook::StripeWebhookVerifier;
use crate::ports::{
    ClassRepSlots, DonationRepository, NotificationDispatcher, OfferingCatalog, PaymentProvider,
    PromoCodeValidator, PurchaseReader, PurchaseRepository, TransactionLedger,
};

use super::dto::{
    CheckoutResponse, ErrorResponse, PendingPurchasesResponse, StartCheckoutRequest,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; dependencies are Arc-wrapped for cheap sharing.
#[derive(Clone)]
pub struct CheckoutAppState {
    pub catalog: Arc<dyn OfferingCatalog>,
    pub purchases: Arc<dyn PurchaseRepository>,
    pub purchase_reader: Arc<dyn PurchaseReader>,
    pub slots: Arc<dyn ClassRepSlots>,
    pub promo_codes: Arc<dyn PromoCodeValidator>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub donations: Arc<dyn DonationRepository>,
    pub ledger: Arc<dyn TransactionLedger>,
    pub notifications: Arc<dyn NotificationDispatcher>,
    pub checkout_config: CheckoutConfig,
    pub webhook_secret: String,
    pub require_livemode: bool,
}

impl CheckoutAppState {
    pub fn start_checkout_handler(&self) -> StartCheckoutHandler {
        StartCheckoutHandler::new(
            self.catalog.clone(),
            self.purchases.clone(),
            self.slots.clone(),
            self.promo_codes.clone(),
            self.payment_provider.clone(),
            self.checkout_config.clone(),
        )
    }

    pub fn retry_handler(&self) -> RetryPurchaseHandler {
        RetryPurchaseHandler::new(
            self.purchases.clone(),
            self.catalog.clone(),
            self.payment_provider.clone(),
            self.checkout_config.clone(),
        )
    }

    pub fn cancel_handler(&self) -> CancelPurchaseHandler {
        CancelPurchaseHandler::new(self.purchases.clone(), self.slots.clone())
    }

    pub fn list_pending_handler(&self) -> ListPendingPurchasesHandler {
        ListPendingPurchasesHandler::new(
            self.purchases.clone(),
            self.purchase_reader.clone(),
            self.checkout_config.clone(),
        )
    }

    pub fn webhook_handler(&self) -> ProcessStripeWebhookHandler {
        ProcessStripeWebhookHandler::new(
            StripeWebhookVerifier::new(self.webhook_secret.clone()),
            self.require_livemode,
            self.purchases.clone(),
            self.donations.clone(),
            self.ledger.clone(),
            self.payment_provider.clone(),
            self.notifications.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context (would come from auth middleware in production)
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from the request.
///
/// In production this would be extracted from a JWT/session by auth
/// middleware. For now, a header-based extraction for development and
/// testing.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<UserId>().ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/checkout - Start or re-submit a checkout attempt
pub async fn start_checkout(
    State(state): State<CheckoutAppState>,
    user: AuthenticatedUser,
    Json(request): Json<StartCheckoutRequest>,
) -> Result<impl IntoResponse, PurchaseApiError> {
    let offering = request.offering()?;
    let handler = state.start_checkout_handler();

    let redirect = handler
        .handle(StartCheckoutCommand {
            user_id: user.user_id,
            offering,
            is_class_rep: request.is_class_rep,
            promo_code: request.promo_code,
        })
        .await?;

    Ok(Json(CheckoutResponse {
        purchase_id: *redirect.purchase_id.as_uuid(),
        order_number: redirect.order_number.to_string(),
        redirect_url: redirect.redirect_url,
    }))
}

/// GET /api/purchases/pending - List pending purchases (sweeps first)
pub async fn list_pending_purchases(
    State(state): State<CheckoutAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, PurchaseApiError> {
    let handler = state.list_pending_handler();
    let views = handler
        .handle(ListPendingPurchasesQuery {
            user_id: user.user_id,
        })
        .await?;

    Ok(Json(PendingPurchasesResponse {
        purchases: views.into_iter().map(Into::into).collect(),
    }))
}

/// POST /api/purchases/{id}/retry - Resume a pending purchase
pub async fn retry_purchase(
    State(state): State<CheckoutAppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, PurchaseApiError> {
    let handler = state.retry_handler();
    let redirect = handler
        .handle(RetryPurchaseCommand {
            purchase_id: PurchaseId::from_uuid(id),
            requester: user.user_id,
        })
        .await?;

    Ok(Json(CheckoutResponse {
        purchase_id: *redirect.purchase_id.as_uuid(),
        order_number: redirect.order_number.to_string(),
        redirect_url: redirect.redirect_url,
    }))
}

/// DELETE /api/purchases/{id} - Cancel a pending purchase
pub async fn cancel_purchase(
    State(state): State<CheckoutAppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, PurchaseApiError> {
    let handler = state.cancel_handler();
    handler
        .handle(CancelPurchaseCommand {
            purchase_id: PurchaseId::from_uuid(id),
            requester: user.user_id,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /health - Service liveness
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/stripe - Process a payment processor event.
///
/// Takes the raw body bytes (no JSON extractor may run first, it would
/// alter the payload before verification). Answers 400 only for
/// signature failures, non-2xx for storage failures so the processor
/// retries, and 200 for everything else.
pub async fn handle_stripe_webhook(
    State(state): State<CheckoutAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> axum::response::Response {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let handler = state.webhook_handler();
    let result = handler
        .handle(ProcessStripeWebhookCommand {
            payload: body.to_vec(),
            signature,
        })
        .await;

    match result {
        Ok(disposition) => {
            tracing::debug!(?disposition, "webhook processed");
            StatusCode::OK.into_response()
        }
        Err(e) if e.is_signature_failure() => {
            tracing::warn!(error = %e, "webhook signature verification failed");
            let body = ErrorResponse::new("SIGNATURE_VERIFICATION_FAILED", e.to_string());
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "webhook processing failed; processor will retry");
            let body = ErrorResponse::new("INTERNAL_ERROR", "webhook processing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts purchase errors to HTTP responses.
pub struct PurchaseApiError(PurchaseError);

impl From<PurchaseError> for PurchaseApiError {
    fn from(err: PurchaseError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PurchaseApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            PurchaseError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED"),
            PurchaseError::OfferingNotFound(_) => (StatusCode::NOT_FOUND, "OFFERING_NOT_FOUND"),
            PurchaseError::NotFound(_) => (StatusCode::NOT_FOUND, "PURCHASE_NOT_FOUND"),
            PurchaseError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            PurchaseError::AlreadyPurchased => (StatusCode::CONFLICT, "ALREADY_PURCHASED"),
            PurchaseError::FreeOfferingNotPurchasable => {
                (StatusCode::BAD_REQUEST, "FREE_OFFERING_NOT_PURCHASABLE")
            }
            PurchaseError::CapacityExceeded => (StatusCode::CONFLICT, "CAPACITY_EXCEEDED"),
            PurchaseError::InvalidState { .. } => {
                (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
            }
            PurchaseError::ExternalService(_) => {
                (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE_ERROR")
            }
            PurchaseError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = ErrorResponse::new(error_code, self.0.message());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{OfferingId, ProgramId};

    fn status_of(err: PurchaseError) -> StatusCode {
        PurchaseApiError(err).into_response().status()
    }

    #[test]
    fn error_statuses_match_the_taxonomy() {
        assert_eq!(
            status_of(PurchaseError::validation("promo_code", "bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PurchaseError::OfferingNotFound(OfferingId::Program(
                ProgramId::new()
            ))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(PurchaseError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(PurchaseError::AlreadyPurchased),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PurchaseError::FreeOfferingNotPurchasable),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(PurchaseError::CapacityExceeded),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PurchaseError::invalid_state("completed", "cancel")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(PurchaseError::external("down")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(PurchaseError::infrastructure("db")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
