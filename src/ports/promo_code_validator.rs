//! Promo code validation port.
//!
//! The promo-code catalog and its redemption rules live outside this
//! crate; checkout only needs the validated discount amount for one code
//! against one offering.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, OfferingId};

/// Outcome of validating a promo code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromoCodeValidation {
    /// The code applies; discount in minor units.
    Valid { discount: i64 },
    /// The code does not apply to this offering.
    Rejected { reason: String },
}

/// Validates promo codes against offerings.
#[async_trait]
pub trait PromoCodeValidator: Send + Sync {
    /// Checks a code for one offering.
    async fn validate(
        &self,
        code: &str,
        offering: &OfferingId,
    ) -> Result<PromoCodeValidation, DomainError>;
}
