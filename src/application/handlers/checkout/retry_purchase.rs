//! RetryPurchaseHandler - Command handler that resumes a pending
//! checkout attempt with a brand-new processor session.
//!
//! The stored price snapshot is reused as-is; retrying never re-prices.
//! Before issuing the new session the handler re-validates that the
//! offering has not been purchased through a different flow in the
//! meantime.

use std::sync::Arc;

use crate::config::CheckoutConfig;
use crate::domain::foundation::{PurchaseId, Timestamp, UserId};
use crate::domain::purchase::{PurchaseError, PurchaseStatus};
use crate::ports::{
    CreateCheckoutSessionRequest, OfferingCatalog, PaymentProvider, PurchaseRepository,
};

use super::start_checkout::CheckoutRedirect;

/// Command to retry a pending purchase.
#[derive(Debug, Clone)]
pub struct RetryPurchaseCommand {
    pub purchase_id: PurchaseId,
    pub requester: UserId,
}

/// Handler for retrying pending purchases.
pub struct RetryPurchaseHandler {
    purchases: Arc<dyn PurchaseRepository>,
    catalog: Arc<dyn OfferingCatalog>,
    payment_provider: Arc<dyn PaymentProvider>,
    config: CheckoutConfig,
}

impl RetryPurchaseHandler {
    pub fn new(
        purchases: Arc<dyn PurchaseRepository>,
        catalog: Arc<dyn OfferingCatalog>,
        payment_provider: Arc<dyn PaymentProvider>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            purchases,
            catalog,
            payment_provider,
            config,
        }
    }

    pub async fn handle(
        &self,
        cmd: RetryPurchaseCommand,
    ) -> Result<CheckoutRedirect, PurchaseError> {
        let mut purchase = self
            .purchases
            .find_by_id(&cmd.purchase_id)
            .await?
            .ok_or(PurchaseError::NotFound(cmd.purchase_id))?;

        if !purchase.owned_by(&cmd.requester) {
            return Err(PurchaseError::Forbidden);
        }

        if purchase.status != PurchaseStatus::Pending {
            return Err(PurchaseError::invalid_state(
                purchase.status.as_str(),
                "retry",
            ));
        }

        // The offering may have been bought through another session while
        // this attempt sat pending
        if self
            .purchases
            .completed_exists(&purchase.user_id, &purchase.offering)
            .await?
        {
            return Err(PurchaseError::AlreadyPurchased);
        }

        let offering = self
            .catalog
            .find(&purchase.offering)
            .await?
            .ok_or(PurchaseError::OfferingNotFound(purchase.offering))?;

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("user_id".to_string(), purchase.user_id.to_string());
        metadata.insert("offering".to_string(), purchase.offering.to_string());

        let session = self
            .payment_provider
            .create_checkout_session(CreateCheckoutSessionRequest {
                amount: purchase.pricing.final_price,
                currency: offering.currency.clone(),
                product_name: offering.title.clone(),
                success_url: self.config.success_url.clone(),
                cancel_url: self.config.cancel_url_for(&purchase.offering.to_string()),
                metadata,
            })
            .await
            .map_err(|e| PurchaseError::external(e.to_string()))?;

        let now = Timestamp::now();
        let pricing = purchase.pricing;
        purchase.refresh_session(session.session_id, pricing, now)?;

        let updated = self.purchases.update_pending(&purchase).await?;
        if !updated {
            if self
                .purchases
                .completed_exists(&purchase.user_id, &purchase.offering)
                .await?
            {
                return Err(PurchaseError::AlreadyPurchased);
            }
            return Err(PurchaseError::infrastructure(
                "pending purchase was finalized concurrently",
            ));
        }

        tracing::info!(
            purchase_id = %purchase.id,
            order_number = %purchase.order_number,
            "pending purchase retried with fresh session"
        );

        Ok(CheckoutRedirect {
            purchase_id: purchase.id,
            order_number: purchase.order_number,
            redirect_url: session.redirect_url,
        })
    }
}
