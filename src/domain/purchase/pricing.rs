//! Final price computation for a checkout attempt.
//!
//! Pure function: all inputs (including the current time) are passed in,
//! so every pricing rule is testable without I/O.
//!
//! Discount rules:
//! - Class representatives get the class-rep discount and nothing else;
//!   the early-bird discount is suppressed even inside its window.
//! - Everyone else gets the early-bird discount while the deadline has
//!   not passed.
//! - A validated promo-code discount stacks independently of both.
//! - The final price never drops below zero.

use serde::{Deserialize, Serialize};

use super::offering::Offering;
use crate::domain::foundation::Timestamp;

/// Priced snapshot stored on the purchase record at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// List price, minor units.
    pub full_price: i64,
    /// Applied class-rep discount (zero when not a class rep).
    pub class_rep_discount: i64,
    /// Applied early-bird discount (zero for class reps or after deadline).
    pub early_bird_discount: i64,
    /// Applied promo-code discount.
    pub promo_discount: i64,
    /// Amount actually charged, floored at zero.
    pub final_price: i64,
    /// Whether the buyer holds a class-rep slot.
    pub is_class_rep: bool,
    /// Whether the early-bird discount applied.
    pub is_early_bird: bool,
}

/// Computes the priced snapshot for one checkout attempt.
pub fn quote_price(
    offering: &Offering,
    is_class_rep: bool,
    promo_discount: Option<i64>,
    now: Timestamp,
) -> PriceQuote {
    let full_price = offering.price.max(0);
    let promo = promo_discount.unwrap_or(0).max(0);

    let in_early_bird_window = offering
        .early_bird_deadline
        .map(|deadline| !now.is_after(&deadline))
        .unwrap_or(false);

    let (class_rep_discount, early_bird_discount, is_early_bird) = if is_class_rep {
        (offering.class_rep_discount.max(0), 0, false)
    } else if in_early_bird_window {
        (0, offering.early_bird_discount.max(0), true)
    } else {
        (0, 0, false)
    };

    let final_price = (full_price - class_rep_discount - early_bird_discount - promo).max(0);

    PriceQuote {
        full_price,
        class_rep_discount,
        early_bird_discount,
        promo_discount: promo,
        final_price,
        is_class_rep,
        is_early_bird,
    }
}
