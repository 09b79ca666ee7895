//! HTTP surface for checkout and webhook processing.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, CheckoutAppState};
pub use routes::{api_router, checkout_routes, webhook_routes};
