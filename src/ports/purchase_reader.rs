//! Read-side port for purchase listings.
//!
//! Display fields (offering title) are joined at query time; the purchase
//! record itself stays free of denormalized display data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, OfferingId, PurchaseId, Timestamp, UserId};
use crate::domain::purchase::OrderNumber;

/// One pending purchase as shown to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPurchaseView {
    pub id: PurchaseId,
    pub order_number: OrderNumber,
    pub offering: OfferingId,
    pub offering_title: String,
    pub final_price: i64,
    pub currency: String,
    pub is_class_rep: bool,
    pub created_at: Timestamp,
}

/// Query access to purchase records.
#[async_trait]
pub trait PurchaseReader: Send + Sync {
    /// Lists the buyer's pending purchases, newest first.
    async fn list_pending(&self, user_id: &UserId)
        -> Result<Vec<PendingPurchaseView>, DomainError>;
}
