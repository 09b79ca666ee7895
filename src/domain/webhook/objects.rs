//! Typed payload objects carried inside webhook events.
//!
//! Each struct captures only the fields the reconciler reads; the rest of
//! Stripe's object schema is ignored by serde.

use serde::Deserialize;
use std::collections::HashMap;

/// `checkout.session` object from `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    /// "payment" for one-time purchases, "subscription" for donations.
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// True when the session created a subscription rather than a
    /// one-time payment.
    pub fn is_subscription(&self) -> bool {
        self.mode == "subscription"
    }
}

/// `payment_intent` object from `payment_intent.succeeded` /
/// `payment_intent.payment_failed`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub latest_charge: Option<String>,
}

/// `invoice` object from `invoice.payment_succeeded`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    pub id: String,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub currency: String,
}
