//! StartCheckoutHandler - Command handler that begins (or re-submits) a
//! checkout attempt.
//!
//! Guarantees exactly one pending purchase per buyer and offering: a
//! repeated call updates the existing pending record in place with a
//! fresh processor session and a re-computed price snapshot. The
//! class-rep slot counter is adjusted by the *net* difference between the
//! desired and the currently held state, so client retries never drift
//! the count.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::CheckoutConfig;
use crate::domain::foundation::{OfferingId, PurchaseId, Timestamp, UserId};
use crate::domain::purchase::{
    quote_price, resolve_slot_adjustment, OrderNumber, Purchase, PurchaseError, SlotAdjustment,
};
use crate::ports::{
    ClassRepSlots, CreateCheckoutSessionRequest, OfferingCatalog, PaymentProvider,
    PromoCodeValidation, PromoCodeValidator, PurchaseRepository,
};

/// Command to start or re-submit a checkout attempt.
#[derive(Debug, Clone)]
pub struct StartCheckoutCommand {
    pub user_id: UserId,
    pub offering: OfferingId,
    pub is_class_rep: bool,
    pub promo_code: Option<String>,
}

/// Result: where to send the buyer.
#[derive(Debug, Clone)]
pub struct CheckoutRedirect {
    pub purchase_id: PurchaseId,
    pub order_number: OrderNumber,
    pub redirect_url: String,
}

/// Handler for starting checkout attempts.
pub struct StartCheckoutHandler {
    catalog: Arc<dyn OfferingCatalog>,
    purchases: Arc<dyn PurchaseRepository>,
    slots: Arc<dyn ClassRepSlots>,
    promo_codes: Arc<dyn PromoCodeValidator>,
    payment_provider: Arc<dyn PaymentProvider>,
    config: CheckoutConfig,
}

impl StartCheckoutHandler {
    pub fn new(
        catalog: Arc<dyn OfferingCatalog>,
        purchases: Arc<dyn PurchaseRepository>,
        slots: Arc<dyn ClassRepSlots>,
        promo_codes: Arc<dyn PromoCodeValidator>,
        payment_provider: Arc<dyn PaymentProvider>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            catalog,
            purchases,
            slots,
            promo_codes,
            payment_provider,
            config,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartCheckoutCommand,
    ) -> Result<CheckoutRedirect, PurchaseError> {
        // 1. The offering must exist, be paid, and not already be owned
        let offering = self
            .catalog
            .find(&cmd.offering)
            .await?
            .ok_or(PurchaseError::OfferingNotFound(cmd.offering))?;

        if offering.is_free() {
            return Err(PurchaseError::FreeOfferingNotPurchasable);
        }

        if self
            .purchases
            .completed_exists(&cmd.user_id, &cmd.offering)
            .await?
        {
            return Err(PurchaseError::AlreadyPurchased);
        }

        // 2. Validate the promo code, if one was submitted
        let promo_discount = match &cmd.promo_code {
            Some(code) => match self.promo_codes.validate(code, &cmd.offering).await? {
                PromoCodeValidation::Valid { discount } => Some(discount),
                PromoCodeValidation::Rejected { reason } => {
                    return Err(PurchaseError::validation("promo_code", reason))
                }
            },
            None => None,
        };

        // 3. Price snapshot
        let now = Timestamp::now();
        let quote = quote_price(&offering, cmd.is_class_rep, promo_discount, now);

        // 4. Net slot adjustment against the existing pending attempt
        let existing = self
            .purchases
            .find_pending_for_offering(&cmd.user_id, &cmd.offering)
            .await?;

        let adjustment =
            resolve_slot_adjustment(existing.as_ref().map(|p| p.pricing.is_class_rep), quote.is_class_rep);
        self.apply_adjustment(&cmd.offering, adjustment).await?;

        // 5. Fresh processor session; roll the slot adjustment back if the
        //    call fails so the buyer is left exactly where they started
        let session = match self
            .payment_provider
            .create_checkout_session(self.session_request(&offering, &quote, &cmd))
            .await
        {
            Ok(session) => session,
            Err(e) => {
                self.undo_adjustment(&cmd.offering, adjustment).await;
                return Err(PurchaseError::external(e.to_string()));
            }
        };

        // 6. One pending record per (buyer, offering): update in place or
        //    create fresh
        match existing {
            Some(mut pending) => {
                pending.refresh_session(session.session_id, quote, now)?;
                let updated = self.purchases.update_pending(&pending).await?;
                if !updated {
                    // A webhook finalized this record between our read and
                    // the guarded write
                    self.undo_adjustment(&cmd.offering, adjustment).await;
                    if self
                        .purchases
                        .completed_exists(&cmd.user_id, &cmd.offering)
                        .await?
                    {
                        return Err(PurchaseError::AlreadyPurchased);
                    }
                    return Err(PurchaseError::infrastructure(
                        "pending purchase was finalized concurrently",
                    ));
                }
                tracing::info!(
                    purchase_id = %pending.id,
                    order_number = %pending.order_number,
                    offering = %cmd.offering,
                    "pending purchase re-submitted with fresh session"
                );
                Ok(CheckoutRedirect {
                    purchase_id: pending.id,
                    order_number: pending.order_number,
                    redirect_url: session.redirect_url,
                })
            }
            None => {
                let purchase = Purchase::new_pending(
                    cmd.user_id,
                    cmd.offering,
                    quote,
                    session.session_id,
                    now,
                );
                if let Err(e) = self.purchases.insert(&purchase).await {
                    self.undo_adjustment(&cmd.offering, adjustment).await;
                    return Err(e.into());
                }
                tracing::info!(
                    purchase_id = %purchase.id,
                    order_number = %purchase.order_number,
                    offering = %cmd.offering,
                    final_price = purchase.pricing.final_price,
                    "pending purchase created"
                );
                Ok(CheckoutRedirect {
                    purchase_id: purchase.id,
                    order_number: purchase.order_number,
                    redirect_url: session.redirect_url,
                })
            }
        }
    }

    fn session_request(
        &self,
        offering: &crate::domain::purchase::Offering,
        quote: &crate::domain::purchase::PriceQuote,
        cmd: &StartCheckoutCommand,
    ) -> CreateCheckoutSessionRequest {
        let mut metadata = HashMap::new();
        metadata.insert("user_id".to_string(), cmd.user_id.to_string());
        metadata.insert("offering".to_string(), cmd.offering.to_string());

        CreateCheckoutSessionRequest {
            amount: quote.final_price,
            currency: offering.currency.clone(),
            product_name: offering.title.clone(),
            success_url: self.config.success_url.clone(),
            cancel_url: self.config.cancel_url_for(&cmd.offering.to_string()),
            metadata,
        }
    }

    async fn apply_adjustment(
        &self,
        offering: &OfferingId,
        adjustment: SlotAdjustment,
    ) -> Result<(), PurchaseError> {
        match adjustment {
            SlotAdjustment::Reserve => {
                self.slots.reserve(offering).await?;
            }
            SlotAdjustment::Release => {
                self.slots.release(offering).await?;
            }
            SlotAdjustment::Keep => {}
        }
        Ok(())
    }

    /// Best-effort compensation; a failure here only loses a slot until
    /// an operator reconciles, so it is logged rather than propagated.
    async fn undo_adjustment(&self, offering: &OfferingId, adjustment: SlotAdjustment) {
        if let Err(e) = self.apply_adjustment(offering, adjustment.inverse()).await {
            tracing::error!(
                offering = %offering,
                error = %e,
                "failed to roll back class-rep slot adjustment"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryClassRepSlots, InMemoryOfferingCatalog, InMemoryPurchaseStore,
        StaticPromoCodeValidator,
    };
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::foundation::ProgramId;
    use crate::domain::purchase::{Offering, PurchaseStatus};

    struct TestContext {
        catalog: Arc<InMemoryOfferingCatalog>,
        purchases: Arc<InMemoryPurchaseStore>,
        slots: Arc<InMemoryClassRepSlots>,
        promo_codes: Arc<StaticPromoCodeValidator>,
        provider: Arc<MockPaymentProvider>,
        handler: StartCheckoutHandler,
        offering: OfferingId,
        user: UserId,
    }

    fn setup() -> TestContext {
        let catalog = Arc::new(InMemoryOfferingCatalog::new());
        let offering = OfferingId::Program(ProgramId::new());
        catalog.insert(Offering {
            id: offering,
            title: "Spring program".to_string(),
            price: 1900,
            currency: "eur".to_string(),
            class_rep_discount: 500,
            early_bird_discount: 400,
            early_bird_deadline: Some(Timestamp::now().add_days(7)),
            class_rep_limit: 2,
        });

        let purchases = Arc::new(InMemoryPurchaseStore::new(catalog.clone()));
        let slots = Arc::new(InMemoryClassRepSlots::new(catalog.clone()));
        let promo_codes = Arc::new(StaticPromoCodeValidator::new());
        let provider = Arc::new(MockPaymentProvider::new());

        let handler = StartCheckoutHandler::new(
            catalog.clone(),
            purchases.clone(),
            slots.clone(),
            promo_codes.clone(),
            provider.clone(),
            CheckoutConfig::default(),
        );

        TestContext {
            catalog,
            purchases,
            slots,
            promo_codes,
            provider,
            handler,
            offering,
            user: UserId::new(),
        }
    }

    fn command(ctx: &TestContext, is_class_rep: bool) -> StartCheckoutCommand {
        StartCheckoutCommand {
            user_id: ctx.user,
            offering: ctx.offering,
            is_class_rep,
            promo_code: None,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Creation
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn creates_pending_purchase_with_class_rep_pricing() {
        let ctx = setup();

        let redirect = ctx.handler.handle(command(&ctx, true)).await.unwrap();
        assert!(redirect.redirect_url.contains("cs_mock_1"));

        let records = ctx.purchases.all();
        assert_eq!(records.len(), 1);
        let purchase = &records[0];
        assert_eq!(purchase.status, PurchaseStatus::Pending);
        assert_eq!(purchase.pricing.final_price, 1400);
        assert!(purchase.pricing.is_class_rep);
        assert!(!purchase.pricing.is_early_bird);
        assert_eq!(ctx.slots.count(&ctx.offering), 1);
    }

    #[tokio::test]
    async fn regular_buyer_gets_early_bird_pricing() {
        let ctx = setup();

        ctx.handler.handle(command(&ctx, false)).await.unwrap();

        let purchase = &ctx.purchases.all()[0];
        assert_eq!(purchase.pricing.final_price, 1500);
        assert!(purchase.pricing.is_early_bird);
        assert_eq!(ctx.slots.count(&ctx.offering), 0);
    }

    #[tokio::test]
    async fn unknown_offering_is_rejected() {
        let ctx = setup();
        let cmd = StartCheckoutCommand {
            user_id: ctx.user,
            offering: OfferingId::Program(ProgramId::new()),
            is_class_rep: false,
            promo_code: None,
        };

        let result = ctx.handler.handle(cmd).await;
        assert!(matches!(result, Err(PurchaseError::OfferingNotFound(_))));
    }

    #[tokio::test]
    async fn free_offering_is_rejected() {
        let ctx = setup();
        let free_id = OfferingId::Program(ProgramId::new());
        ctx.catalog.insert(Offering {
            id: free_id,
            title: "Open evening".to_string(),
            price: 0,
            currency: "eur".to_string(),
            class_rep_discount: 0,
            early_bird_discount: 0,
            early_bird_deadline: None,
            class_rep_limit: 0,
        });

        let cmd = StartCheckoutCommand {
            user_id: ctx.user,
            offering: free_id,
            is_class_rep: false,
            promo_code: None,
        };

        let result = ctx.handler.handle(cmd).await;
        assert!(matches!(
            result,
            Err(PurchaseError::FreeOfferingNotPurchasable)
        ));
        assert!(ctx.purchases.all().is_empty());
    }

    #[tokio::test]
    async fn already_purchased_offering_is_rejected() {
        let ctx = setup();
        let mut completed = Purchase::new_pending(
            ctx.user,
            ctx.offering,
            quote_price(
                &ctx.catalog.find(&ctx.offering).await.unwrap().unwrap(),
                false,
                None,
                Timestamp::now(),
            ),
            "cs_earlier",
            Timestamp::now(),
        );
        completed.complete(Some("pi_earlier".to_string()), Timestamp::now()).unwrap();
        ctx.purchases.insert_raw(completed);

        let result = ctx.handler.handle(command(&ctx, false)).await;
        assert!(matches!(result, Err(PurchaseError::AlreadyPurchased)));
    }

    // ══════════════════════════════════════════════════════════════
    // Re-submission
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn second_call_updates_pending_record_in_place() {
        let ctx = setup();

        ctx.handler.handle(command(&ctx, false)).await.unwrap();
        ctx.handler.handle(command(&ctx, false)).await.unwrap();

        let records = ctx.purchases.all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stripe_session_id, "cs_mock_2");
        assert_eq!(ctx.provider.sessions_created(), 2);
    }

    #[tokio::test]
    async fn triple_class_rep_submission_reserves_one_slot() {
        let ctx = setup();

        for _ in 0..3 {
            ctx.handler.handle(command(&ctx, true)).await.unwrap();
        }

        assert_eq!(ctx.slots.count(&ctx.offering), 1);
        assert_eq!(ctx.purchases.all().len(), 1);
    }

    #[tokio::test]
    async fn switching_away_and_back_returns_count_to_one() {
        let ctx = setup();

        ctx.handler.handle(command(&ctx, true)).await.unwrap();
        ctx.handler.handle(command(&ctx, false)).await.unwrap();
        assert_eq!(ctx.slots.count(&ctx.offering), 0);

        ctx.handler.handle(command(&ctx, true)).await.unwrap();
        assert_eq!(ctx.slots.count(&ctx.offering), 1);

        let purchase = &ctx.purchases.all()[0];
        assert!(purchase.pricing.is_class_rep);
        assert_eq!(purchase.pricing.final_price, 1400);
    }

    // ══════════════════════════════════════════════════════════════
    // Capacity
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn capacity_exhaustion_rejects_new_class_rep() {
        let ctx = setup();

        // Two other buyers take both slots
        for _ in 0..2 {
            let cmd = StartCheckoutCommand {
                user_id: UserId::new(),
                offering: ctx.offering,
                is_class_rep: true,
                promo_code: None,
            };
            ctx.handler.handle(cmd).await.unwrap();
        }

        let result = ctx.handler.handle(command(&ctx, true)).await;
        assert!(matches!(result, Err(PurchaseError::CapacityExceeded)));
        assert_eq!(ctx.slots.count(&ctx.offering), 2);
    }

    // ══════════════════════════════════════════════════════════════
    // Processor Failure
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn session_failure_rolls_back_reservation_and_record() {
        let ctx = setup();
        ctx.provider.fail_next_session();

        let result = ctx.handler.handle(command(&ctx, true)).await;

        assert!(matches!(result, Err(PurchaseError::ExternalService(_))));
        assert_eq!(ctx.slots.count(&ctx.offering), 0);
        assert!(ctx.purchases.all().is_empty());
    }

    #[tokio::test]
    async fn session_failure_on_resubmission_keeps_old_record() {
        let ctx = setup();
        ctx.handler.handle(command(&ctx, false)).await.unwrap();

        ctx.provider.fail_next_session();
        let result = ctx.handler.handle(command(&ctx, true)).await;

        assert!(matches!(result, Err(PurchaseError::ExternalService(_))));
        // The reservation taken for the attempted switch was rolled back
        assert_eq!(ctx.slots.count(&ctx.offering), 0);
        // The original pending record is untouched
        let purchase = &ctx.purchases.all()[0];
        assert_eq!(purchase.stripe_session_id, "cs_mock_1");
        assert!(!purchase.pricing.is_class_rep);
    }

    // ══════════════════════════════════════════════════════════════
    // Promo Codes
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn valid_promo_code_reduces_price() {
        let ctx = setup();
        ctx.promo_codes.insert("SPRING200", 200);

        let cmd = StartCheckoutCommand {
            promo_code: Some("SPRING200".to_string()),
            ..command(&ctx, false)
        };
        ctx.handler.handle(cmd).await.unwrap();

        let purchase = &ctx.purchases.all()[0];
        assert_eq!(purchase.pricing.promo_discount, 200);
        assert_eq!(purchase.pricing.final_price, 1300);
    }

    #[tokio::test]
    async fn rejected_promo_code_fails_validation() {
        let ctx = setup();

        let cmd = StartCheckoutCommand {
            promo_code: Some("BOGUS".to_string()),
            ..command(&ctx, false)
        };
        let result = ctx.handler.handle(cmd).await;

        assert!(matches!(result, Err(PurchaseError::Validation { .. })));
        assert!(ctx.purchases.all().is_empty());
    }

    // ══════════════════════════════════════════════════════════════
    // Session Request Contents
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn cancel_url_encodes_offering_reference() {
        let ctx = setup();

        ctx.handler.handle(command(&ctx, false)).await.unwrap();

        let request = ctx.provider.last_request().unwrap();
        assert!(request.cancel_url.contains(&ctx.offering.to_string()));
        assert_eq!(request.amount, 1500);
        assert_eq!(request.metadata.get("user_id").unwrap(), &ctx.user.to_string());
    }
}
