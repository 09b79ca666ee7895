//! PostgreSQL adapter implementations of the storage ports.

mod class_rep_slots;
mod donation_repository;
mod offering_catalog;
mod purchase_reader;
mod purchase_repository;
mod transaction_ledger;

pub use class_rep_slots::PostgresClassRepSlots;
pub use donation_repository::PostgresDonationRepository;
pub use offering_catalog::PostgresOfferingCatalog;
pub use purchase_reader::PostgresPurchaseReader;
pub use purchase_repository::PostgresPurchaseRepository;
pub use transaction_ledger::PostgresTransactionLedger;
