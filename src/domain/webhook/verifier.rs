//! Stripe webhook signature verification.
//!
//! Implements secure verification of Stripe webhook signatures using
//! HMAC-SHA256. Includes timestamp validation to prevent replay attacks.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::errors::WebhookError;
use super::stripe_event::StripeEvent;

/// Maximum allowed age for webhook events (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signature (HMAC-SHA256).
    pub v1_signature: Vec<u8>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v0=<legacy>]`
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Parse` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signature: Option<Vec<u8>> = None;

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| WebhookError::parse("invalid header format"))?;

            match key {
                "t" => {
                    timestamp = Some(
                        value
                            .parse()
                            .map_err(|_| WebhookError::parse("invalid timestamp"))?,
                    );
                }
                "v1" => {
                    v1_signature = Some(
                        hex::decode(value)
                            .map_err(|_| WebhookError::parse("invalid v1 signature hex"))?,
                    );
                }
                _ => {
                    // Ignore v0 and unknown fields for forward compatibility
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| WebhookError::parse("missing timestamp"))?;
        let v1_signature =
            v1_signature.ok_or_else(|| WebhookError::parse("missing v1 signature"))?;

        Ok(SignatureHeader {
            timestamp,
            v1_signature,
        })
    }
}

/// Verifier for Stripe webhook signatures.
pub struct StripeWebhookVerifier {
    /// The webhook signing secret from the Stripe dashboard.
    secret: String,
}

impl StripeWebhookVerifier {
    /// Creates a new verifier with the given webhook secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies the webhook signature and parses the event.
    ///
    /// # Verification Steps
    ///
    /// 1. Parse the signature header
    /// 2. Validate timestamp is within acceptable range
    /// 3. Compute expected signature using HMAC-SHA256
    /// 4. Compare signatures using constant-time comparison
    /// 5. Parse the JSON payload into a StripeEvent
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` - Signature verification failed
    /// - `TimestampTooOld` - Event is older than 5 minutes
    /// - `TimestampInFuture` - Event timestamp is in the future
    /// - `Parse` - Failed to parse header or JSON payload
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;

        self.validate_timestamp(header.timestamp)?;

        let expected_signature = self.compute_signature(header.timestamp, payload);
        if !constant_time_compare(&expected_signature, &header.v1_signature) {
            return Err(WebhookError::InvalidSignature);
        }

        let event: StripeEvent =
            serde_json::from_slice(payload).map_err(|e| WebhookError::parse(e.to_string()))?;

        Ok(event)
    }

    /// Validates that the timestamp is within acceptable bounds.
    fn validate_timestamp(&self, timestamp: i64) -> Result<(), WebhookError> {
        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > MAX_EVENT_AGE_SECS {
            return Err(WebhookError::TimestampTooOld);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::TimestampInFuture);
        }

        Ok(())
    }

    /// Computes the HMAC-SHA256 signature for the given timestamp and payload.
    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));

        let mut mac =
            Hmac::<Sha256>::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key");
        mac.update(signed_payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Performs constant-time comparison of two byte slices.
///
/// This prevents timing attacks that could leak information about the
/// expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a valid Stripe-Signature header for test fixtures.
pub fn sign_test_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(signed_payload.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";

    fn event_payload() -> Vec<u8> {
        serde_json::json!({
            "id": "evt_sig_test",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "data": {"object": {}},
            "livemode": false
        })
        .to_string()
        .into_bytes()
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parses_valid_header() {
        let header = SignatureHeader::parse("t=1704067200,v1=deadbeef").unwrap();
        assert_eq!(header.timestamp, 1704067200);
        assert_eq!(header.v1_signature, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn ignores_v0_and_unknown_fields() {
        let header =
            SignatureHeader::parse("t=1704067200,v1=00ff,v0=1234,x=whatever").unwrap();
        assert_eq!(header.v1_signature, vec![0x00, 0xff]);
    }

    #[test]
    fn rejects_missing_timestamp() {
        assert!(matches!(
            SignatureHeader::parse("v1=deadbeef"),
            Err(WebhookError::Parse(_))
        ));
    }

    #[test]
    fn rejects_missing_v1() {
        assert!(matches!(
            SignatureHeader::parse("t=1704067200"),
            Err(WebhookError::Parse(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_timestamp() {
        assert!(SignatureHeader::parse("t=abc,v1=00").is_err());
    }

    #[test]
    fn rejects_invalid_hex() {
        assert!(SignatureHeader::parse("t=1704067200,v1=zzzz").is_err());
    }

    #[test]
    fn rejects_garbage_header() {
        assert!(SignatureHeader::parse("no-equals-here").is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn accepts_correctly_signed_payload() {
        let verifier = StripeWebhookVerifier::new(TEST_SECRET);
        let payload = event_payload();
        let now = chrono::Utc::now().timestamp();
        let header = sign_test_payload(TEST_SECRET, now, &payload);

        let event = verifier.verify_and_parse(&payload, &header).unwrap();
        assert_eq!(event.id, "evt_sig_test");
    }

    #[test]
    fn rejects_wrong_secret() {
        let verifier = StripeWebhookVerifier::new(TEST_SECRET);
        let payload = event_payload();
        let now = chrono::Utc::now().timestamp();
        let header = sign_test_payload("whsec_other_secret", now, &payload);

        assert_eq!(
            verifier.verify_and_parse(&payload, &header),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_tampered_payload() {
        let verifier = StripeWebhookVerifier::new(TEST_SECRET);
        let payload = event_payload();
        let now = chrono::Utc::now().timestamp();
        let header = sign_test_payload(TEST_SECRET, now, &payload);

        let mut tampered = payload.clone();
        tampered[0] = b' ';

        assert_eq!(
            verifier.verify_and_parse(&tampered, &header),
            Err(WebhookError::InvalidSignature)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let verifier = StripeWebhookVerifier::new(TEST_SECRET);
        let payload = event_payload();
        let stale = chrono::Utc::now().timestamp() - MAX_EVENT_AGE_SECS - 10;
        let header = sign_test_payload(TEST_SECRET, stale, &payload);

        assert_eq!(
            verifier.verify_and_parse(&payload, &header),
            Err(WebhookError::TimestampTooOld)
        );
    }

    #[test]
    fn rejects_future_timestamp() {
        let verifier = StripeWebhookVerifier::new(TEST_SECRET);
        let payload = event_payload();
        let future = chrono::Utc::now().timestamp() + MAX_CLOCK_SKEW_SECS + 10;
        let header = sign_test_payload(TEST_SECRET, future, &payload);

        assert_eq!(
            verifier.verify_and_parse(&payload, &header),
            Err(WebhookError::TimestampInFuture)
        );
    }

    #[test]
    fn small_clock_skew_is_tolerated() {
        let verifier = StripeWebhookVerifier::new(TEST_SECRET);
        let payload = event_payload();
        let slightly_ahead = chrono::Utc::now().timestamp() + 30;
        let header = sign_test_payload(TEST_SECRET, slightly_ahead, &payload);

        assert!(verifier.verify_and_parse(&payload, &header).is_ok());
    }

    #[test]
    fn valid_signature_with_invalid_json_is_parse_error() {
        let verifier = StripeWebhookVerifier::new(TEST_SECRET);
        let payload = b"not json at all".to_vec();
        let now = chrono::Utc::now().timestamp();
        let header = sign_test_payload(TEST_SECRET, now, &payload);

        assert!(matches!(
            verifier.verify_and_parse(&payload, &header),
            Err(WebhookError::Parse(_))
        ));
    }
}
