//! Webhook reconciliation handler.

mod process_webhook;

pub use process_webhook::{
    ProcessStripeWebhookCommand, ProcessStripeWebhookHandler, WebhookDisposition,
};
