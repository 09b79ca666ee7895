//! Recurring donation domain.
//!
//! A donation is a processor-managed subscription; each successfully
//! billed cycle is recorded as one [`DonationTransaction`]. The
//! reconciliation pattern matches one-time purchases, with one extra
//! idempotency guard: the `(donation, payment intent)` pair is unique, so
//! redelivered billing events never produce duplicate ledger entries.

mod donation;
mod transaction;

pub use donation::Donation;
pub use transaction::DonationTransaction;
