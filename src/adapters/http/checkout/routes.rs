//! Axum router configuration for the checkout and webhook endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{
    cancel_purchase, handle_stripe_webhook, health, list_pending_purchases, retry_purchase,
    start_checkout, CheckoutAppState,
};

/// Create the checkout API router.
///
/// # Routes (require authentication)
/// - `POST /checkout` - Start or re-submit a checkout attempt
/// - `GET /purchases/pending` - List pending purchases (sweeps stale ones)
/// - `POST /purchases/{id}/retry` - Resume a pending purchase
/// - `DELETE /purchases/{id}` - Cancel a pending purchase
pub fn checkout_routes() -> Router<CheckoutAppState> {
    Router::new()
        .route("/checkout", post(start_checkout))
        .route("/purchases/pending", get(list_pending_purchases))
        .route("/purchases/:id/retry", post(retry_purchase))
        .route("/purchases/:id", delete(cancel_purchase))
}

/// Create the webhook router.
///
/// Separate from the API routes because webhooks carry no user
/// authentication (they are verified via signature) and must receive the
/// raw body bytes.
///
/// # Routes
/// - `POST /stripe` - Process payment processor events
pub fn webhook_routes() -> Router<CheckoutAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Create the complete application router.
pub fn api_router() -> Router<CheckoutAppState> {
    Router::new()
        .nest("/api", checkout_routes())
        .nest("/webhooks", webhook_routes())
        .route("/health", get(health))
}
