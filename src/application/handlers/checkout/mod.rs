//! Checkout lifecycle handlers: start, retry, cancel, and the pending
//! listing with its inline housekeeping sweep.

mod cancel_purchase;
mod list_pending;
mod retry_purchase;
mod start_checkout;

pub use cancel_purchase::{CancelPurchaseCommand, CancelPurchaseHandler};
pub use list_pending::{ListPendingPurchasesHandler, ListPendingPurchasesQuery};
pub use retry_purchase::{RetryPurchaseCommand, RetryPurchaseHandler};
pub use start_checkout::{CheckoutRedirect, StartCheckoutCommand, StartCheckoutHandler};
