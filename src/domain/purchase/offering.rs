//! Offering snapshot consumed by the checkout flow.
//!
//! The catalog itself (programs, events, their CRUD) lives outside this
//! crate; checkout only needs the pricing and capacity configuration
//! returned by the offering lookup port.

use crate::domain::foundation::{OfferingId, Timestamp};
use serde::{Deserialize, Serialize};

/// Pricing and capacity configuration for one purchasable offering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offering {
    /// The offering being sold.
    pub id: OfferingId,

    /// Display title, used for the processor checkout page.
    pub title: String,

    /// List price in minor currency units. Zero means the offering is free.
    pub price: i64,

    /// ISO 4217 currency code, lowercase (e.g. "eur").
    pub currency: String,

    /// Discount for class representatives, minor units.
    pub class_rep_discount: i64,

    /// Early-bird discount, minor units.
    pub early_bird_discount: i64,

    /// Last moment the early-bird discount applies, if configured.
    pub early_bird_deadline: Option<Timestamp>,

    /// Maximum class-rep slots. Zero means unlimited.
    pub class_rep_limit: i32,
}

impl Offering {
    /// Free offerings are never purchasable; access is granted by
    /// eligibility checks elsewhere.
    pub fn is_free(&self) -> bool {
        self.price == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ProgramId;

    #[test]
    fn zero_price_is_free() {
        let offering = Offering {
            id: OfferingId::Program(ProgramId::new()),
            title: "Intro course".to_string(),
            price: 0,
            currency: "eur".to_string(),
            class_rep_discount: 0,
            early_bird_discount: 0,
            early_bird_deadline: None,
            class_rep_limit: 0,
        };
        assert!(offering.is_free());
    }
}
