//! In-memory payment provider for tests and local development.
//!
//! Mints deterministic session ids, records every request, and can be
//! rigged to fail the next session creation to exercise rollback paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::domain::purchase::BillingDetails;
use crate::ports::{
    CheckoutSessionHandle, CreateCheckoutSessionRequest, PaymentError, PaymentIntentSummary,
    PaymentProvider,
};

/// Scriptable in-memory payment provider.
#[derive(Default)]
pub struct MockPaymentProvider {
    session_counter: AtomicU32,
    fail_next_session: AtomicBool,
    requests: Mutex<Vec<CreateCheckoutSessionRequest>>,
    /// payment intent id -> latest charge id
    intents: Mutex<HashMap<String, Option<String>>>,
    /// charge id -> billing snapshot
    charges: Mutex<HashMap<String, BillingDetails>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `create_checkout_session` call fail with a timeout.
    pub fn fail_next_session(&self) {
        self.fail_next_session.store(true, Ordering::SeqCst);
    }

    /// Number of sessions created so far.
    pub fn sessions_created(&self) -> u32 {
        self.session_counter.load(Ordering::SeqCst)
    }

    /// The most recent session creation request, if any.
    pub fn last_request(&self) -> Option<CreateCheckoutSessionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Registers a payment intent and its latest charge.
    pub fn register_payment_intent(&self, intent_id: &str, charge_id: Option<&str>) {
        self.intents
            .lock()
            .unwrap()
            .insert(intent_id.to_string(), charge_id.map(str::to_string));
    }

    /// Registers a charge's billing snapshot.
    pub fn register_charge(&self, charge_id: &str, details: BillingDetails) {
        self.charges
            .lock()
            .unwrap()
            .insert(charge_id.to_string(), details);
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, PaymentError> {
        if self.fail_next_session.swap(false, Ordering::SeqCst) {
            return Err(PaymentError::timeout("simulated session creation timeout"));
        }

        self.requests.lock().unwrap().push(request);
        let n = self.session_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("cs_mock_{}", n);

        Ok(CheckoutSessionHandle {
            redirect_url: format!("https://checkout.stripe.test/pay/{}", session_id),
            session_id,
        })
    }

    async fn get_payment_intent(&self, id: &str) -> Result<PaymentIntentSummary, PaymentError> {
        let intents = self.intents.lock().unwrap();
        match intents.get(id) {
            Some(charge) => Ok(PaymentIntentSummary {
                id: id.to_string(),
                latest_charge_id: charge.clone(),
            }),
            None => Err(PaymentError::not_found("payment intent")),
        }
    }

    async fn get_charge(&self, id: &str) -> Result<BillingDetails, PaymentError> {
        let charges = self.charges.lock().unwrap();
        charges
            .get(id)
            .cloned()
            .ok_or_else(|| PaymentError::not_found("charge"))
    }
}
