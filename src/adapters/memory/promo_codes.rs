//! Static promo-code validator for tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::foundation::{DomainError, OfferingId};
use crate::ports::{PromoCodeValidation, PromoCodeValidator};

/// Validator backed by a fixed code table.
#[derive(Default)]
pub struct StaticPromoCodeValidator {
    codes: Mutex<HashMap<String, i64>>,
}

impl StaticPromoCodeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a code with its discount in minor units.
    pub fn insert(&self, code: impl Into<String>, discount: i64) {
        self.codes.lock().unwrap().insert(code.into(), discount);
    }
}

#[async_trait]
impl PromoCodeValidator for StaticPromoCodeValidator {
    async fn validate(
        &self,
        code: &str,
        _offering: &OfferingId,
    ) -> Result<PromoCodeValidation, DomainError> {
        let codes = self.codes.lock().unwrap();
        Ok(match codes.get(code) {
            Some(discount) => PromoCodeValidation::Valid {
                discount: *discount,
            },
            None => PromoCodeValidation::Rejected {
                reason: "unknown or expired code".to_string(),
            },
        })
    }
}
