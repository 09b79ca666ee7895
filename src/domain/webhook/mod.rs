//! Webhook domain: event envelope, payload objects, signature
//! verification, and the error policy that drives the endpoint's
//! response codes.

mod errors;
mod objects;
mod stripe_event;
mod verifier;

pub use errors::WebhookError;
pub use objects::{CheckoutSessionObject, InvoiceObject, PaymentIntentObject};
pub use stripe_event::{StripeEvent, StripeEventData, StripeEventType};
pub use verifier::{sign_test_payload, SignatureHeader, StripeWebhookVerifier};
