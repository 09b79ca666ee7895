//! ProcessStripeWebhookHandler - Applies verified processor events to
//! purchase records and the donation ledger.
//!
//! ## Delivery model
//!
//! The processor delivers at least once and out of order, so every
//! branch below is safe to run twice, and the two events of a one-time
//! purchase (`checkout.session.completed` and
//! `payment_intent.succeeded`) may arrive in either order or alone.
//!
//! ## Response policy
//!
//! - Signature problems are the only client errors (400).
//! - A failed core write returns `Storage` so the processor retries.
//! - Everything else - unknown event types, records already cleaned up,
//!   test/garbage events - is logged and acknowledged, because a retry
//!   could never make those actionable.
//! - Billing enrichment and notification dispatch run after the core
//!   transition committed; their failures are logged and swallowed.

use std::sync::Arc;

use crate::domain::donation::DonationTransaction;
use crate::domain::foundation::{PurchaseId, Timestamp};
use crate::domain::purchase::{OrderNumber, Purchase};
use crate::domain::webhook::{
    CheckoutSessionObject, InvoiceObject, PaymentIntentObject, SignatureHeader, StripeEvent,
    StripeEventType, StripeWebhookVerifier, WebhookError,
};
use crate::ports::{
    CompletionOutcome, DonationRepository, FailureOutcome, LedgerOutcome, NotificationDispatcher,
    PaymentProvider, PurchaseRepository, TransactionLedger,
};

/// Command carrying one raw webhook delivery.
#[derive(Debug, Clone)]
pub struct ProcessStripeWebhookCommand {
    /// Raw, unaltered request body (required for signature verification).
    pub payload: Vec<u8>,
    /// The Stripe-Signature header, if present.
    pub signature: Option<String>,
}

/// What the reconciler did with the event.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookDisposition {
    /// A pending purchase reached `completed`.
    PurchaseCompleted {
        purchase_id: PurchaseId,
        order_number: OrderNumber,
    },
    /// The purchase was already completed; the duplicate changed nothing.
    AlreadyCompleted,
    /// A pending purchase was marked failed.
    PurchaseFailed,
    /// Processor identifiers were attached to a donation.
    DonationRefsAttached,
    /// One donation billing cycle was recorded.
    CycleRecorded,
    /// The billing cycle was already on the ledger.
    DuplicateCycle,
    /// Event acknowledged without action.
    Acknowledged(&'static str),
}

/// Handler applying webhook events to local state.
pub struct ProcessStripeWebhookHandler {
    verifier: StripeWebhookVerifier,
    require_livemode: bool,
    purchases: Arc<dyn PurchaseRepository>,
    donations: Arc<dyn DonationRepository>,
    ledger: Arc<dyn TransactionLedger>,
    payment_provider: Arc<dyn PaymentProvider>,
    notifications: Arc<dyn NotificationDispatcher>,
}

impl ProcessStripeWebhookHandler {
    pub fn new(
        verifier: StripeWebhookVerifier,
        require_livemode: bool,
        purchases: Arc<dyn PurchaseRepository>,
        donations: Arc<dyn DonationRepository>,
        ledger: Arc<dyn TransactionLedger>,
        payment_provider: Arc<dyn PaymentProvider>,
        notifications: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            verifier,
            require_livemode,
            purchases,
            donations,
            ledger,
            payment_provider,
            notifications,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessStripeWebhookCommand,
    ) -> Result<WebhookDisposition, WebhookError> {
        let signature = cmd
            .signature
            .as_deref()
            .ok_or(WebhookError::MissingSignatureHeader)?;

        // An unparseable header means the signature cannot be verified
        SignatureHeader::parse(signature)?;

        let event = match self.verifier.verify_and_parse(&cmd.payload, signature) {
            Ok(event) => event,
            Err(WebhookError::Parse(msg)) => {
                // Signature verified but the body is not a usable event;
                // a redelivery would carry the same bytes
                tracing::warn!(error = %msg, "acknowledging unparseable webhook payload");
                return Ok(WebhookDisposition::Acknowledged("unparseable payload"));
            }
            Err(e) => return Err(e),
        };

        if self.require_livemode && event.is_test() {
            tracing::warn!(event_id = %event.id, "ignoring test-mode event in production");
            return Ok(WebhookDisposition::Acknowledged("test-mode event"));
        }

        match event.parsed_type() {
            StripeEventType::CheckoutSessionCompleted => {
                self.on_session_completed(&event).await
            }
            StripeEventType::PaymentIntentSucceeded => {
                self.on_payment_intent_succeeded(&event).await
            }
            StripeEventType::PaymentIntentPaymentFailed => {
                self.on_payment_intent_failed(&event).await
            }
            StripeEventType::InvoicePaymentSucceeded => self.on_invoice_paid(&event).await,
            StripeEventType::Unknown => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "ignoring unhandled event type"
                );
                Ok(WebhookDisposition::Acknowledged("unhandled event type"))
            }
        }
    }

    /// `checkout.session.completed`.
    ///
    /// One-time purchases complete immediately. Subscription sessions
    /// (recurring donations) only get their processor identifiers
    /// attached here; the ledger entry for the first payment is created
    /// exclusively by `invoice.payment_succeeded`, because the processor
    /// fires both events for new subscriptions and recording here too
    /// would double-count the first cycle.
    async fn on_session_completed(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookDisposition, WebhookError> {
        let Ok(session) = event.deserialize_object::<CheckoutSessionObject>() else {
            tracing::warn!(event_id = %event.id, "malformed checkout session object");
            return Ok(WebhookDisposition::Acknowledged("malformed session object"));
        };

        if session.is_subscription() {
            return self.attach_donation_refs(event, &session).await;
        }

        let now = Timestamp::now();
        match self
            .purchases
            .complete_by_session(&session.id, session.payment_intent.as_deref(), now)
            .await?
        {
            CompletionOutcome::Completed(purchase) => {
                tracing::info!(
                    event_id = %event.id,
                    purchase_id = %purchase.id,
                    order_number = %purchase.order_number,
                    "purchase completed via checkout session"
                );
                self.enrich_billing(&purchase).await;
                self.notify_completed(&purchase).await;
                Ok(WebhookDisposition::PurchaseCompleted {
                    purchase_id: purchase.id,
                    order_number: purchase.order_number,
                })
            }
            CompletionOutcome::AlreadyCompleted(purchase) => {
                tracing::info!(
                    event_id = %event.id,
                    purchase_id = %purchase.id,
                    "duplicate completion event for completed purchase"
                );
                // Re-running enrichment is safe: populated fields are
                // never overwritten
                self.enrich_billing(&purchase).await;
                Ok(WebhookDisposition::AlreadyCompleted)
            }
            CompletionOutcome::NotFound => {
                tracing::warn!(
                    event_id = %event.id,
                    session_id = %session.id,
                    "no purchase for completed session; acknowledging"
                );
                Ok(WebhookDisposition::Acknowledged("no matching purchase"))
            }
        }
    }

    /// `payment_intent.succeeded`.
    ///
    /// Belt-and-braces companion to the session event. When it arrives
    /// first the payment intent is not yet known locally and the event is
    /// acknowledged; completion then happens via the session event.
    async fn on_payment_intent_succeeded(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookDisposition, WebhookError> {
        let Ok(intent) = event.deserialize_object::<PaymentIntentObject>() else {
            tracing::warn!(event_id = %event.id, "malformed payment intent object");
            return Ok(WebhookDisposition::Acknowledged("malformed intent object"));
        };

        let now = Timestamp::now();
        match self
            .purchases
            .complete_by_payment_intent(&intent.id, now)
            .await?
        {
            CompletionOutcome::Completed(purchase) => {
                tracing::info!(
                    event_id = %event.id,
                    purchase_id = %purchase.id,
                    payment_intent_id = %intent.id,
                    "purchase completed via payment intent"
                );
                self.enrich_billing(&purchase).await;
                self.notify_completed(&purchase).await;
                Ok(WebhookDisposition::PurchaseCompleted {
                    purchase_id: purchase.id,
                    order_number: purchase.order_number,
                })
            }
            CompletionOutcome::AlreadyCompleted(_) => Ok(WebhookDisposition::AlreadyCompleted),
            CompletionOutcome::NotFound => {
                tracing::info!(
                    event_id = %event.id,
                    payment_intent_id = %intent.id,
                    "no purchase references this payment intent yet; acknowledging"
                );
                Ok(WebhookDisposition::Acknowledged("no matching purchase"))
            }
        }
    }

    /// `payment_intent.payment_failed`.
    async fn on_payment_intent_failed(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookDisposition, WebhookError> {
        let Ok(intent) = event.deserialize_object::<PaymentIntentObject>() else {
            tracing::warn!(event_id = %event.id, "malformed payment intent object");
            return Ok(WebhookDisposition::Acknowledged("malformed intent object"));
        };

        let now = Timestamp::now();
        match self
            .purchases
            .fail_by_payment_intent(&intent.id, now)
            .await?
        {
            FailureOutcome::Failed(purchase) => {
                tracing::info!(
                    event_id = %event.id,
                    purchase_id = %purchase.id,
                    payment_intent_id = %intent.id,
                    "purchase marked failed"
                );
                Ok(WebhookDisposition::PurchaseFailed)
            }
            FailureOutcome::AlreadyTerminal => {
                Ok(WebhookDisposition::Acknowledged("purchase already final"))
            }
            FailureOutcome::NotFound => {
                tracing::info!(
                    event_id = %event.id,
                    payment_intent_id = %intent.id,
                    "no purchase for failed payment intent; acknowledging"
                );
                Ok(WebhookDisposition::Acknowledged("no matching purchase"))
            }
        }
    }

    /// `invoice.payment_succeeded` - subscriptions (donations) only.
    ///
    /// The ledger's `(donation, payment intent)` uniqueness makes the
    /// redelivered event a no-op.
    async fn on_invoice_paid(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookDisposition, WebhookError> {
        let Ok(invoice) = event.deserialize_object::<InvoiceObject>() else {
            tracing::warn!(event_id = %event.id, "malformed invoice object");
            return Ok(WebhookDisposition::Acknowledged("malformed invoice object"));
        };

        let Some(subscription_id) = invoice.subscription.as_deref() else {
            return Ok(WebhookDisposition::Acknowledged(
                "invoice without subscription",
            ));
        };
        let Some(payment_intent_id) = invoice.payment_intent.as_deref() else {
            return Ok(WebhookDisposition::Acknowledged(
                "invoice without payment intent",
            ));
        };

        let Some(donation) = self
            .donations
            .find_by_subscription_id(subscription_id)
            .await?
        else {
            tracing::warn!(
                event_id = %event.id,
                subscription_id,
                "no donation for subscription; acknowledging"
            );
            return Ok(WebhookDisposition::Acknowledged("no matching donation"));
        };

        let tx = DonationTransaction::new(
            donation.id,
            payment_intent_id,
            invoice.amount_paid,
            invoice.currency.clone(),
            Timestamp::now(),
        );

        match self.ledger.record(&tx).await? {
            LedgerOutcome::Recorded => {
                tracing::info!(
                    event_id = %event.id,
                    donation_id = %donation.id,
                    payment_intent_id,
                    amount = invoice.amount_paid,
                    "donation billing cycle recorded"
                );
                Ok(WebhookDisposition::CycleRecorded)
            }
            LedgerOutcome::DuplicateCycle => {
                tracing::info!(
                    event_id = %event.id,
                    donation_id = %donation.id,
                    payment_intent_id,
                    "duplicate billing cycle delivery"
                );
                Ok(WebhookDisposition::DuplicateCycle)
            }
        }
    }

    /// Subscription checkout completed: attach processor identifiers to
    /// the donation. Never records a transaction.
    async fn attach_donation_refs(
        &self,
        event: &StripeEvent,
        session: &CheckoutSessionObject,
    ) -> Result<WebhookDisposition, WebhookError> {
        let Some(mut donation) = self.donations.find_by_session_id(&session.id).await? else {
            tracing::warn!(
                event_id = %event.id,
                session_id = %session.id,
                "no donation for subscription session; acknowledging"
            );
            return Ok(WebhookDisposition::Acknowledged("no matching donation"));
        };

        donation.attach_processor_refs(
            session.customer.clone(),
            session.subscription.clone(),
            Timestamp::now(),
        );
        self.donations.update(&donation).await?;

        tracing::info!(
            event_id = %event.id,
            donation_id = %donation.id,
            "processor identifiers attached to donation"
        );
        Ok(WebhookDisposition::DonationRefsAttached)
    }

    /// Fetches the payment-method snapshot and writes it once. Failures
    /// here never affect the acknowledgment: the status transition has
    /// already committed.
    async fn enrich_billing(&self, purchase: &Purchase) {
        let Some(payment_intent_id) = purchase.stripe_payment_intent_id.as_deref() else {
            return;
        };

        let details = async {
            let intent = self
                .payment_provider
                .get_payment_intent(payment_intent_id)
                .await?;
            match intent.latest_charge_id {
                Some(charge_id) => self.payment_provider.get_charge(&charge_id).await.map(Some),
                None => Ok(None),
            }
        }
        .await;

        match details {
            Ok(Some(details)) => {
                if let Err(e) = self
                    .purchases
                    .record_billing_details(&purchase.id, &details)
                    .await
                {
                    tracing::warn!(
                        purchase_id = %purchase.id,
                        error = %e,
                        "failed to store billing details"
                    );
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    purchase_id = %purchase.id,
                    error = %e,
                    "billing enrichment failed"
                );
            }
        }
    }

    /// Fire-and-forget completion notice.
    async fn notify_completed(&self, purchase: &Purchase) {
        if let Err(e) = self.notifications.purchase_completed(purchase).await {
            tracing::warn!(
                purchase_id = %purchase.id,
                error = %e,
                "completion notification failed"
            );
        }
    }
}
