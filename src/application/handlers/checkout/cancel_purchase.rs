//! CancelPurchaseHandler - Command handler that abandons a pending
//! checkout attempt.
//!
//! Cancellation is a hard delete: an abandoned pending record carries no
//! lasting value. A class-rep reservation held by the record is released
//! symmetrically.

use std::sync::Arc;

use crate::domain::foundation::{PurchaseId, UserId};
use crate::domain::purchase::{PurchaseError, PurchaseStatus};
use crate::ports::{ClassRepSlots, PurchaseRepository};

/// Command to cancel a pending purchase.
#[derive(Debug, Clone)]
pub struct CancelPurchaseCommand {
    pub purchase_id: PurchaseId,
    pub requester: UserId,
}

/// Handler for cancelling pending purchases.
pub struct CancelPurchaseHandler {
    purchases: Arc<dyn PurchaseRepository>,
    slots: Arc<dyn ClassRepSlots>,
}

impl CancelPurchaseHandler {
    pub fn new(purchases: Arc<dyn PurchaseRepository>, slots: Arc<dyn ClassRepSlots>) -> Self {
        Self { purchases, slots }
    }

    pub async fn handle(&self, cmd: CancelPurchaseCommand) -> Result<(), PurchaseError> {
        let purchase = self
            .purchases
            .find_by_id(&cmd.purchase_id)
            .await?
            .ok_or(PurchaseError::NotFound(cmd.purchase_id))?;

        if !purchase.owned_by(&cmd.requester) {
            return Err(PurchaseError::Forbidden);
        }

        match purchase.status {
            PurchaseStatus::Pending => {}
            PurchaseStatus::Completed => {
                return Err(PurchaseError::cannot_modify_completed("cancel"))
            }
            other => {
                return Err(PurchaseError::invalid_state(other.as_str(), "cancel"));
            }
        }

        let deleted = self.purchases.delete_pending(&cmd.purchase_id).await?;
        if !deleted {
            // Finalized between our read and the guarded delete
            return match self.purchases.find_by_id(&cmd.purchase_id).await? {
                Some(current) => Err(PurchaseError::invalid_state(
                    current.status.as_str(),
                    "cancel",
                )),
                None => Ok(()),
            };
        }

        if purchase.pricing.is_class_rep {
            self.slots.release(&purchase.offering).await?;
        }

        tracing::info!(
            purchase_id = %purchase.id,
            order_number = %purchase.order_number,
            was_class_rep = purchase.pricing.is_class_rep,
            "pending purchase cancelled"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryClassRepSlots, InMemoryOfferingCatalog, InMemoryPurchaseStore,
    };
    use crate::domain::foundation::{OfferingId, ProgramId, Timestamp};
    use crate::domain::purchase::{quote_price, Offering, Purchase};
    use crate::ports::ClassRepSlots as _;

    struct TestContext {
        purchases: Arc<InMemoryPurchaseStore>,
        slots: Arc<InMemoryClassRepSlots>,
        handler: CancelPurchaseHandler,
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
            early_bird_deadline: None,
            class_rep_limit: 2,
        });

        let purchases = Arc::new(InMemoryPurchaseStore::new(catalog.clone()));
        let slots = Arc::new(InMemoryClassRepSlots::new(catalog));
        let handler = CancelPurchaseHandler::new(purchases.clone(), slots.clone());

        TestContext {
            purchases,
            slots,
            handler,
            offering,
            user: UserId::new(),
        }
    }

    fn offering_config(ctx: &TestContext) -> Offering {
        Offering {
            id: ctx.offering,
            title: "Spring program".to_string(),
            price: 1900,
            currency: "eur".to_string(),
            class_rep_discount: 500,
            early_bird_discount: 400,
            early_bird_deadline: None,
            class_rep_limit: 2,
        }
    }

    async fn seed_pending(ctx: &TestContext, is_class_rep: bool) -> Purchase {
        let purchase = Purchase::new_pending(
            ctx.user,
            ctx.offering,
            quote_price(&offering_config(ctx), is_class_rep, None, Timestamp::now()),
            "cs_seed",
            Timestamp::now(),
        );
        ctx.purchases.insert_raw(purchase.clone());
        if is_class_rep {
            ctx.slots.reserve(&ctx.offering).await.unwrap();
        }
        purchase
    }

    #[tokio::test]
    async fn cancel_deletes_record_and_releases_slot() {
        let ctx = setup();
        let purchase = seed_pending(&ctx, true).await;
        assert_eq!(ctx.slots.count(&ctx.offering), 1);

        ctx.handler
            .handle(CancelPurchaseCommand {
                purchase_id: purchase.id,
                requester: ctx.user,
            })
            .await
            .unwrap();

        assert!(ctx.purchases.all().is_empty());
        assert_eq!(ctx.slots.count(&ctx.offering), 0);
    }

    #[tokio::test]
    async fn cancel_regular_purchase_leaves_slots_alone() {
        let ctx = setup();
        let purchase = seed_pending(&ctx, false).await;

        ctx.handler
            .handle(CancelPurchaseCommand {
                purchase_id: purchase.id,
                requester: ctx.user,
            })
            .await
            .unwrap();

        assert!(ctx.purchases.all().is_empty());
        assert_eq!(ctx.slots.count(&ctx.offering), 0);
    }

    #[tokio::test]
    async fn cancel_unknown_purchase_is_not_found() {
        let ctx = setup();
        let result = ctx
            .handler
            .handle(CancelPurchaseCommand {
                purchase_id: PurchaseId::new(),
                requester: ctx.user,
            })
            .await;
        assert!(matches!(result, Err(PurchaseError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancel_by_non_owner_is_forbidden() {
        let ctx = setup();
        let purchase = seed_pending(&ctx, false).await;

        let result = ctx
            .handler
            .handle(CancelPurchaseCommand {
                purchase_id: purchase.id,
                requester: UserId::new(),
            })
            .await;

        assert!(matches!(result, Err(PurchaseError::Forbidden)));
        assert_eq!(ctx.purchases.all().len(), 1);
    }

    #[tokio::test]
    async fn cancel_completed_purchase_is_rejected() {
        let ctx = setup();
        let mut purchase = Purchase::new_pending(
            ctx.user,
            ctx.offering,
            quote_price(&offering_config(&ctx), false, None, Timestamp::now()),
            "cs_done",
            Timestamp::now(),
        );
        purchase
            .complete(Some("pi_done".to_string()), Timestamp::now())
            .unwrap();
        ctx.purchases.insert_raw(purchase.clone());

        let result = ctx
            .handler
            .handle(CancelPurchaseCommand {
                purchase_id: purchase.id,
                requester: ctx.user,
            })
            .await;

        assert!(matches!(
            result,
            Err(PurchaseError::InvalidState { ref current, .. }) if current == "completed"
        ));
        assert_eq!(ctx.purchases.all().len(), 1);
    }
}
