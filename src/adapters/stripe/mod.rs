//! Stripe payment provider adapters.
//!
//! [`StripeClient`] talks to the real Stripe API; [`MockPaymentProvider`]
//! is an in-memory stand-in for tests and local development.

mod client;
mod mock_provider;

pub use client::{StripeClient, StripeClientConfig};
pub use mock_provider::MockPaymentProvider;
