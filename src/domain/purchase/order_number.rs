//! Human-readable order numbers.
//!
//! Minted once at purchase creation and never reused. The date prefix
//! keeps numbers roughly sortable for support staff; the random suffix
//! makes collisions practically impossible and is additionally backed by
//! a unique constraint in storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::foundation::{Timestamp, ValidationError};

/// Externally visible order number, e.g. `ORD-20260806-9F3C2A`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    const PREFIX: &'static str = "ORD-";

    /// Mints a fresh order number for the given creation time.
    pub fn generate(created_at: Timestamp) -> Self {
        let date = created_at.as_datetime().format("%Y%m%d");
        let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
        Self(format!("{}{}-{}", Self::PREFIX, date, suffix))
    }

    /// Wraps an order number read back from storage.
    pub fn from_string(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::empty_field("order_number"));
        }
        if !value.starts_with(Self::PREFIX) {
            return Err(ValidationError::invalid_format(
                "order_number",
                "must start with ORD-",
            ));
        }
        Ok(Self(value))
    }

    /// Returns the raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_number_has_expected_shape() {
        let number = OrderNumber::generate(Timestamp::from_unix_secs(1_754_438_400));
        let s = number.as_str();
        assert!(s.starts_with("ORD-2025"));
        assert_eq!(s.len(), "ORD-".len() + 8 + 1 + 6);
    }

    #[test]
    fn generated_numbers_are_unique() {
        let now = Timestamp::now();
        let a = OrderNumber::generate(now);
        let b = OrderNumber::generate(now);
        assert_ne!(a, b);
    }

    #[test]
    fn from_string_accepts_generated_form() {
        let number = OrderNumber::generate(Timestamp::now());
        let parsed = OrderNumber::from_string(number.as_str()).unwrap();
        assert_eq!(parsed, number);
    }

    #[test]
    fn from_string_rejects_empty() {
        assert!(OrderNumber::from_string("").is_err());
    }

    #[test]
    fn from_string_rejects_foreign_prefix() {
        assert!(OrderNumber::from_string("INV-20260806-ABCDEF").is_err());
    }
}
