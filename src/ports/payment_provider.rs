//! Payment provider port for external payment processing.
//!
//! Defines the contract for the payment gateway integration (Stripe).
//! Calls must carry a bounded timeout; a hung processor call must never
//! hold a request open indefinitely.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::purchase::BillingDetails;

/// Port for the payment provider integration.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates a hosted checkout session for the given amount.
    ///
    /// Returns the session id (stored on the purchase record for webhook
    /// correlation) and the URL the buyer is redirected to.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, PaymentError>;

    /// Fetches a payment intent, primarily for its latest charge id.
    async fn get_payment_intent(&self, id: &str) -> Result<PaymentIntentSummary, PaymentError>;

    /// Fetches the payment-method snapshot from a charge.
    async fn get_charge(&self, id: &str) -> Result<BillingDetails, PaymentError>;
}

/// Request to create a hosted checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    /// Amount to charge, minor units.
    pub amount: i64,

    /// ISO 4217 currency code, lowercase.
    pub currency: String,

    /// Line-item label shown on the checkout page.
    pub product_name: String,

    /// URL to redirect after successful checkout.
    pub success_url: String,

    /// URL to redirect after cancelled checkout.
    pub cancel_url: String,

    /// Correlation metadata echoed back in webhook events.
    pub metadata: HashMap<String, String>,
}

/// A created checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSessionHandle {
    /// Provider's session id (cs_...).
    pub session_id: String,

    /// URL for the buyer to complete checkout.
    pub redirect_url: String,
}

/// Payment intent summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentSummary {
    pub id: String,
    pub latest_charge_id: Option<String>,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    /// Create a not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    /// Create a provider-side error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    /// Create an invalid-response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidResponse, message)
    }
}

impl std::fmt::Display for PaymentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        DomainError::new(ErrorCode::ExternalServiceError, err.to_string())
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Call exceeded its bounded timeout.
    Timeout,

    /// Resource not found at the provider.
    NotFound,

    /// Provider API error.
    ProviderError,

    /// Provider response could not be parsed.
    InvalidResponse,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError | PaymentErrorCode::Timeout
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn PaymentProvider) {}
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(PaymentErrorCode::NetworkError.is_retryable());
        assert!(PaymentErrorCode::Timeout.is_retryable());
        assert!(!PaymentErrorCode::NotFound.is_retryable());
        assert!(!PaymentErrorCode::ProviderError.is_retryable());
    }

    #[test]
    fn payment_error_display_includes_code_and_message() {
        let err = PaymentError::timeout("session create took too long");
        assert!(err.to_string().contains("timeout"));
        assert!(err.to_string().contains("session create took too long"));
    }

    #[test]
    fn payment_error_converts_to_external_service_error() {
        let err: DomainError = PaymentError::network("connection refused").into();
        assert_eq!(err.code, ErrorCode::ExternalServiceError);
    }
}
