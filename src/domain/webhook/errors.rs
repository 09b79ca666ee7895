//! Webhook processing error types.
//!
//! The split between variants matters for the endpoint's response policy:
//! signature problems are the caller's fault (400), storage problems must
//! make the processor retry (5xx), and everything else is acknowledged so
//! the processor stops redelivering.

/// Errors raised while verifying or applying a webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    /// The Stripe-Signature header is missing.
    MissingSignatureHeader,

    /// The signature did not verify against the payload.
    InvalidSignature,

    /// The signed timestamp is older than the replay window.
    TimestampTooOld,

    /// The signed timestamp is too far in the future.
    TimestampInFuture,

    /// The signature header or payload could not be parsed.
    Parse(String),

    /// A core status transition could not be persisted; the processor
    /// must retry delivery.
    Storage(String),
}

impl WebhookError {
    pub fn parse(message: impl Into<String>) -> Self {
        WebhookError::Parse(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        WebhookError::Storage(message.into())
    }

    /// True when the endpoint should answer 400 (signature failed to
    /// verify or could not be checked at all).
    pub fn is_signature_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignatureHeader
                | WebhookError::InvalidSignature
                | WebhookError::TimestampTooOld
                | WebhookError::TimestampInFuture
                | WebhookError::Parse(_)
        )
    }
}

impl std::fmt::Display for WebhookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookError::MissingSignatureHeader => {
                write!(f, "Missing Stripe-Signature header")
            }
            WebhookError::InvalidSignature => write!(f, "Invalid webhook signature"),
            WebhookError::TimestampTooOld => {
                write!(f, "Webhook timestamp outside replay window")
            }
            WebhookError::TimestampInFuture => {
                write!(f, "Webhook timestamp is in the future")
            }
            WebhookError::Parse(msg) => write!(f, "Failed to parse webhook: {}", msg),
            WebhookError::Storage(msg) => write!(f, "Webhook storage failure: {}", msg),
        }
    }
}

impl std::error::Error for WebhookError {}

/// Repository failures surface as storage errors so the endpoint answers
/// non-2xx and the processor redelivers.
impl From<crate::domain::foundation::DomainError> for WebhookError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        WebhookError::Storage(err.to_string())
    }
}
