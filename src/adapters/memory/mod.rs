//! In-memory adapter implementations.
//!
//! Used by unit and integration tests and by local development without a
//! database. Each store mirrors the atomicity contract of its port: state
//! lives behind one mutex and every mutating operation checks its guard
//! predicate and writes under the same lock.

mod class_rep_slots;
mod donation_store;
mod notification;
mod offering_catalog;
mod promo_codes;
mod purchase_store;
mod transaction_ledger;

pub use class_rep_slots::InMemoryClassRepSlots;
pub use donation_store::InMemoryDonationStore;
pub use notification::CountingNotificationDispatcher;
pub use offering_catalog::InMemoryOfferingCatalog;
pub use promo_codes::StaticPromoCodeValidator;
pub use purchase_store::InMemoryPurchaseStore;
pub use transaction_ledger::InMemoryTransactionLedger;
