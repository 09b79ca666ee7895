//! ListPendingPurchasesHandler - Query handler that lists a buyer's
//! pending purchases, sweeping out abandoned and superseded records
//! first.
//!
//! The sweep runs inline on every listing: records untouched for longer
//! than the configured TTL are hard-deleted, as are pending records whose
//! offering already has a completed sibling (the buyer purchased through
//! a different session after abandoning this one).

use std::sync::Arc;

use crate::config::CheckoutConfig;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::purchase::PurchaseError;
use crate::ports::{PendingPurchaseView, PurchaseReader, PurchaseRepository};

/// Query for the buyer's pending purchases.
#[derive(Debug, Clone)]
pub struct ListPendingPurchasesQuery {
    pub user_id: UserId,
}

/// Handler for listing pending purchases.
pub struct ListPendingPurchasesHandler {
    purchases: Arc<dyn PurchaseRepository>,
    reader: Arc<dyn PurchaseReader>,
    config: CheckoutConfig,
}

impl ListPendingPurchasesHandler {
    pub fn new(
        purchases: Arc<dyn PurchaseRepository>,
        reader: Arc<dyn PurchaseReader>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            purchases,
            reader,
            config,
        }
    }

    pub async fn handle(
        &self,
        query: ListPendingPurchasesQuery,
    ) -> Result<Vec<PendingPurchaseView>, PurchaseError> {
        let cutoff = Timestamp::now().minus_hours(self.config.pending_ttl_hours as i64);

        let expired = self
            .purchases
            .purge_expired_pending(&query.user_id, cutoff)
            .await?;
        let superseded = self
            .purchases
            .purge_superseded_pending(&query.user_id)
            .await?;

        if expired > 0 || superseded > 0 {
            tracing::info!(
                user_id = %query.user_id,
                expired,
                superseded,
                "swept stale pending purchases"
            );
        }

        Ok(self.reader.list_pending(&query.user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryOfferingCatalog, InMemoryPurchaseStore};
    use crate::domain::foundation::{OfferingId, ProgramId};
    use crate::domain::purchase::{quote_price, Offering, Purchase};

    struct TestContext {
        catalog: Arc<InMemoryOfferingCatalog>,
        purchases: Arc<InMemoryPurchaseStore>,
        handler: ListPendingPurchasesHandler,
        user: UserId,
    }

    fn setup() -> TestContext {
        let catalog = Arc::new(InMemoryOfferingCatalog::new());
        let purchases = Arc::new(InMemoryPurchaseStore::new(catalog.clone()));
        let handler = ListPendingPurchasesHandler::new(
            purchases.clone(),
            purchases.clone(),
            CheckoutConfig::default(),
        );
        TestContext {
            catalog,
            purchases,
            handler,
            user: UserId::new(),
        }
    }

    fn seed_offering(ctx: &TestContext) -> Offering {
        let offering = Offering {
            id: OfferingId::Program(ProgramId::new()),
            title: "Autumn program".to_string(),
            price: 2400,
            currency: "eur".to_string(),
            class_rep_discount: 300,
            early_bird_discount: 0,
            early_bird_deadline: None,
            class_rep_limit: 0,
        };
        ctx.catalog.insert(offering.clone());
        offering
    }

    fn pending_aged(
        ctx: &TestContext,
        offering: &Offering,
        hours_old: i64,
        session: &str,
    ) -> Purchase {
        let created = Timestamp::now().minus_hours(hours_old);
        let mut purchase = Purchase::new_pending(
            ctx.user,
            offering.id,
            quote_price(offering, false, None, created),
            session,
            created,
        );
        purchase.created_at = created;
        purchase.updated_at = created;
        ctx.purchases.insert_raw(purchase.clone());
        purchase
    }

    #[tokio::test]
    async fn expired_pending_is_swept_on_listing() {
        let ctx = setup();
        let offering = seed_offering(&ctx);
        pending_aged(&ctx, &offering, 25, "cs_old");

        let views = ctx
            .handler
            .handle(ListPendingPurchasesQuery { user_id: ctx.user })
            .await
            .unwrap();

        assert!(views.is_empty());
        assert!(ctx.purchases.all().is_empty());
    }

    #[tokio::test]
    async fn fresh_pending_survives_listing() {
        let ctx = setup();
        let offering = seed_offering(&ctx);
        let purchase = pending_aged(&ctx, &offering, 2, "cs_fresh");

        let views = ctx
            .handler
            .handle(ListPendingPurchasesQuery { user_id: ctx.user })
            .await
            .unwrap();

        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, purchase.id);
        assert_eq!(views[0].offering_title, "Autumn program");
        assert_eq!(views[0].final_price, 2400);
    }

    #[tokio::test]
    async fn recently_retried_old_pending_survives() {
        let ctx = setup();
        let offering = seed_offering(&ctx);
        // Created 30 hours ago but retried one hour ago
        let created = Timestamp::now().minus_hours(30);
        let mut purchase = Purchase::new_pending(
            ctx.user,
            offering.id,
            quote_price(&offering, false, None, created),
            "cs_before_retry",
            created,
        );
        purchase
            .refresh_session(
                "cs_after_retry",
                purchase.pricing,
                Timestamp::now().minus_hours(1),
            )
            .unwrap();
        ctx.purchases.insert_raw(purchase);

        let views = ctx
            .handler
            .handle(ListPendingPurchasesQuery { user_id: ctx.user })
            .await
            .unwrap();

        assert_eq!(views.len(), 1);
    }

    #[tokio::test]
    async fn superseded_pending_is_swept_on_listing() {
        let ctx = setup();
        let offering = seed_offering(&ctx);
        pending_aged(&ctx, &offering, 2, "cs_abandoned");

        // Completed sibling for the same offering via a different session
        let mut completed = Purchase::new_pending(
            ctx.user,
            offering.id,
            quote_price(&offering, false, None, Timestamp::now()),
            "cs_completed",
            Timestamp::now(),
        );
        completed
            .complete(Some("pi_done".to_string()), Timestamp::now())
            .unwrap();
        ctx.purchases.insert_raw(completed);

        let views = ctx
            .handler
            .handle(ListPendingPurchasesQuery { user_id: ctx.user })
            .await
            .unwrap();

        assert!(views.is_empty());
        // The completed record itself is untouched
        let remaining = ctx.purchases.all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].stripe_session_id, "cs_completed");
    }

    #[tokio::test]
    async fn other_users_records_are_untouched() {
        let ctx = setup();
        let offering = seed_offering(&ctx);
        pending_aged(&ctx, &offering, 25, "cs_mine_old");

        let other_user = UserId::new();
        let other = Purchase::new_pending(
            other_user,
            offering.id,
            quote_price(&offering, false, None, Timestamp::now().minus_hours(30)),
            "cs_theirs",
            Timestamp::now().minus_hours(30),
        );
        ctx.purchases.insert_raw(other);

        ctx.handler
            .handle(ListPendingPurchasesQuery { user_id: ctx.user })
            .await
            .unwrap();

        // The other user's stale record survives until they list
        let remaining = ctx.purchases.all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].user_id, other_user);
    }
}
