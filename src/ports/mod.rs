//! Ports: trait contracts between the application core and the adapters.

mod class_rep_slots;
mod donation_repository;
mod notification_dispatcher;
mod offering_catalog;
mod payment_provider;
mod promo_code_validator;
mod purchase_reader;
mod purchase_repository;
mod transaction_ledger;

pub use class_rep_slots::ClassRepSlots;
pub use donation_repository::DonationRepository;
pub use notification_dispatcher::NotificationDispatcher;
pub use offering_catalog::OfferingCatalog;
pub use payment_provider::{
    CheckoutSessionHandle, CreateCheckoutSessionRequest, PaymentError, PaymentErrorCode,
    PaymentIntentSummary, PaymentProvider,
};
pub use promo_code_validator::{PromoCodeValidation, PromoCodeValidator};
pub use purchase_reader::{PendingPurchaseView, PurchaseReader};
pub use purchase_repository::{CompletionOutcome, FailureOutcome, PurchaseRepository};
pub use transaction_ledger::{LedgerOutcome, TransactionLedger};
