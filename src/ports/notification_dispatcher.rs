//! Notification dispatch port.
//!
//! Fire-and-forget: callers log failures and continue. A notification
//! problem must never roll back a purchase transition or fail a webhook
//! acknowledgment.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::purchase::Purchase;

/// Outbound notification delivery (email, in-app messages).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Notifies the buyer that their purchase completed.
    async fn purchase_completed(&self, purchase: &Purchase) -> Result<(), DomainError>;
}
