//! Checkout flow configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Checkout flow configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    /// URL the processor redirects to after successful payment
    #[serde(default = "default_success_url")]
    pub success_url: String,

    /// URL template the processor redirects to after a cancelled checkout.
    /// `{offering}` is replaced with the offering reference.
    #[serde(default = "default_cancel_url")]
    pub cancel_url: String,

    /// Hours a pending purchase survives before the housekeeper deletes it
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_hours: u64,
}

impl CheckoutConfig {
    /// Build the cancel URL for a specific offering reference.
    pub fn cancel_url_for(&self, offering_ref: &str) -> String {
        self.cancel_url.replace("{offering}", offering_ref)
    }

    /// Validate checkout configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.success_url.starts_with("http") {
            return Err(ValidationError::InvalidCheckoutUrl("success_url"));
        }
        if !self.cancel_url.starts_with("http") {
            return Err(ValidationError::InvalidCheckoutUrl("cancel_url"));
        }
        if self.pending_ttl_hours == 0 {
            return Err(ValidationError::InvalidPendingTtl);
        }
        Ok(())
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            success_url: default_success_url(),
            cancel_url: default_cancel_url(),
            pending_ttl_hours: default_pending_ttl(),
        }
    }
}

fn default_success_url() -> String {
    "http://localhost:3000/purchases/success".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:3000/purchases/cancelled?offering={offering}".to_string()
}

fn default_pending_ttl() -> u64 {
    24
}
