//! Stripe API client.
//!
//! Implements the `PaymentProvider` port over Stripe's form-encoded REST
//! API. Every call carries a bounded timeout from configuration; a hung
//! processor must never hold a checkout request open.
//!
//! # Security
//!
//! - API keys handled via `secrecy::SecretString`
//! - Webhook signatures are verified separately by the domain verifier,
//!   which sees the raw request bytes

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::config::PaymentConfig;
use crate::domain::purchase::BillingDetails;
use crate::ports::{
    CheckoutSessionHandle, CreateCheckoutSessionRequest, PaymentError, PaymentIntentSummary,
    PaymentProvider,
};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeClientConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Per-request timeout.
    timeout: Duration,
}

impl StripeClientConfig {
    /// Create a new configuration.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            timeout,
        }
    }

    /// Build from the application payment config section.
    pub fn from_payment_config(config: &PaymentConfig) -> Self {
        Self::new(
            config.stripe_api_key.clone(),
            Duration::from_secs(config.api_timeout_secs),
        )
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripeClient {
    config: StripeClientConfig,
    http_client: reqwest::Client,
}

impl StripeClient {
    /// Create a new Stripe client with the given configuration.
    pub fn new(config: StripeClientConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            config,
            http_client,
        }
    }

    fn map_request_error(e: reqwest::Error) -> PaymentError {
        if e.is_timeout() {
            PaymentError::timeout(e.to_string())
        } else {
            PaymentError::network(e.to_string())
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
    ) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::not_found(resource));
        }
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(resource, error = %error_text, "Stripe API call failed");
            return Err(PaymentError::provider(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::invalid_response(e.to_string()))
    }
}

/// Checkout session response (fields we read).
#[derive(Debug, Deserialize)]
struct StripeSessionResponse {
    id: String,
    url: Option<String>,
}

/// Payment intent response (fields we read).
#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    latest_charge: Option<String>,
}

/// Charge response (fields we read).
#[derive(Debug, Deserialize)]
struct StripeChargeResponse {
    #[serde(default)]
    billing_details: StripeBillingDetails,
    #[serde(default)]
    payment_method_details: Option<StripePaymentMethodDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct StripeBillingDetails {
    name: Option<String>,
    address: Option<StripeAddress>,
}

#[derive(Debug, Deserialize)]
struct StripeAddress {
    line1: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
}

impl StripeAddress {
    /// Collapses the structured address into a single display line.
    fn to_line(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.line1.as_deref(),
            self.city.as_deref(),
            self.postal_code.as_deref(),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripePaymentMethodDetails {
    card: Option<StripeCardDetails>,
}

#[derive(Debug, Deserialize)]
struct StripeCardDetails {
    brand: Option<String>,
    last4: Option<String>,
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let mut params = vec![
            ("mode", "payment".to_string()),
            (
                "line_items[0][price_data][currency]",
                request.currency.clone(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.product_name.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount.to_string(),
            ),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
        ];

        let metadata_params: Vec<(String, String)> = request
            .metadata
            .iter()
            .map(|(k, v)| (format!("metadata[{}]", k), v.clone()))
            .collect();

        for (k, v) in &metadata_params {
            params.push((k.as_str(), v.clone()));
        }

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(error = %error_text, "Stripe checkout session creation failed");
            return Err(PaymentError::provider(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let session: StripeSessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::invalid_response(e.to_string()))?;

        let redirect_url = session.url.ok_or_else(|| {
            PaymentError::invalid_response("checkout session has no redirect URL")
        })?;

        Ok(CheckoutSessionHandle {
            session_id: session.id,
            redirect_url,
        })
    }

    async fn get_payment_intent(&self, id: &str) -> Result<PaymentIntentSummary, PaymentError> {
        let response: StripePaymentIntentResponse = self
            .get_json(&format!("/v1/payment_intents/{}", id), "payment intent")
            .await?;

        Ok(PaymentIntentSummary {
            id: response.id,
            latest_charge_id: response.latest_charge,
        })
    }

    async fn get_charge(&self, id: &str) -> Result<BillingDetails, PaymentError> {
        let response: StripeChargeResponse =
            self.get_json(&format!("/v1/charges/{}", id), "charge").await?;

        let card = response
            .payment_method_details
            .and_then(|details| details.card);

        Ok(BillingDetails {
            cardholder_name: response.billing_details.name,
            card_brand: card.as_ref().and_then(|c| c.brand.clone()),
            card_last4: card.as_ref().and_then(|c| c.last4.clone()),
            billing_address: response
                .billing_details
                .address
                .as_ref()
                .and_then(StripeAddress::to_line),
        })
    }
}
