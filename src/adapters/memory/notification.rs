//! Recording notification dispatcher for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::purchase::Purchase;
use crate::ports::NotificationDispatcher;

/// Counts dispatch attempts; optionally fails every call.
#[derive(Default)]
pub struct CountingNotificationDispatcher {
    sent: AtomicU32,
    fail: bool,
}

impl CountingNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            sent: AtomicU32::new(0),
            fail: true,
        }
    }

    /// Number of dispatch attempts seen.
    pub fn attempts(&self) -> u32 {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationDispatcher for CountingNotificationDispatcher {
    async fn purchase_completed(&self, _purchase: &Purchase) -> Result<(), DomainError> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                "notification channel unavailable",
            ));
        }
        Ok(())
    }
}
