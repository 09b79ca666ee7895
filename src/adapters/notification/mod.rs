//! Notification dispatch adapter.
//!
//! The real notification subsystem (email, in-app messages) lives in a
//! separate service; this adapter forwards completion notices over
//! structured logs so operators can verify delivery attempts. It honors
//! the fire-and-forget contract of the port.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::purchase::Purchase;
use crate::ports::NotificationDispatcher;

/// Dispatcher that records completion notices in the service log.
#[derive(Default)]
pub struct LoggingNotificationDispatcher;

impl LoggingNotificationDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for LoggingNotificationDispatcher {
    async fn purchase_completed(&self, purchase: &Purchase) -> Result<(), DomainError> {
        tracing::info!(
            purchase_id = %purchase.id,
            order_number = %purchase.order_number,
            user_id = %purchase.user_id,
            offering = %purchase.offering,
            "purchase completed notification dispatched"
        );
        Ok(())
    }
}
