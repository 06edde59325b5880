//! Entry validation for people, line items and charge rates.
//!
//! Nothing enters the session without passing through here, which is what
//! lets the allocation engine assume finite, positive prices.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Shortest accepted name, after trimming
pub const MIN_NAME_LENGTH: usize = 2;
/// Longest accepted name, after trimming
pub const MAX_NAME_LENGTH: usize = 50;
/// Highest accepted line item price
pub const MAX_PRICE: f64 = 1_000_000.0;
/// Lowest accepted charge rate, in percent
pub const MIN_RATE_PERCENT: f64 = 0.0;
/// Highest accepted charge rate, in percent
pub const MAX_RATE_PERCENT: f64 = 100.0;

/// What kind of entry a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Person,
    Product,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Person => write!(f, "Person"),
            EntityKind::Product => write!(f, "Product"),
        }
    }
}

/// A single rejected field
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("{kind} name is required")]
    NameRequired { kind: EntityKind },

    #[error("{kind} name must be at least {min} characters", min = MIN_NAME_LENGTH)]
    NameTooShort { kind: EntityKind },

    #[error("{kind} name must be at most {max} characters", max = MAX_NAME_LENGTH)]
    NameTooLong { kind: EntityKind },

    #[error("{kind} name already exists: {name}")]
    DuplicateName { kind: EntityKind, name: String },

    #[error("Price must be a valid number")]
    PriceNotFinite,

    #[error("Price must be greater than 0")]
    PriceNotPositive,

    #[error("Price must not exceed 1,000,000")]
    PriceTooHigh,

    #[error("{field} must be a valid number")]
    RateNotFinite { field: &'static str },

    #[error("{field} must be between {min} and {max}, got {value}", min = MIN_RATE_PERCENT, max = MAX_RATE_PERCENT)]
    RateOutOfRange { field: &'static str, value: f64 },
}

impl FieldError {
    /// Name of the input field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::NameRequired { .. }
            | FieldError::NameTooShort { .. }
            | FieldError::NameTooLong { .. }
            | FieldError::DuplicateName { .. } => "name",
            FieldError::PriceNotFinite
            | FieldError::PriceNotPositive
            | FieldError::PriceTooHigh => "price",
            FieldError::RateNotFinite { field } | FieldError::RateOutOfRange { field, .. } => *field,
        }
    }
}

/// Validate a new name against the names already in use
///
/// Returns the trimmed name that should be stored.
pub fn validate_name<'a, I>(kind: EntityKind, raw: &str, existing: I) -> Result<String, FieldError>
where
    I: IntoIterator<Item = &'a str>,
{
    let name = raw.trim();
    if name.is_empty() {
        return Err(FieldError::NameRequired { kind });
    }

    let length = name.chars().count();
    if length < MIN_NAME_LENGTH {
        return Err(FieldError::NameTooShort { kind });
    }
    if length > MAX_NAME_LENGTH {
        return Err(FieldError::NameTooLong { kind });
    }

    let lowered = name.to_lowercase();
    if existing.into_iter().any(|other| other.trim().to_lowercase() == lowered) {
        return Err(FieldError::DuplicateName { kind, name: name.to_string() });
    }

    Ok(name.to_string())
}

/// Validate a line item price
pub fn validate_price(price: f64) -> Result<f64, FieldError> {
    if !price.is_finite() {
        return Err(FieldError::PriceNotFinite);
    }
    if price <= 0.0 {
        return Err(FieldError::PriceNotPositive);
    }
    if price > MAX_PRICE {
        return Err(FieldError::PriceTooHigh);
    }
    Ok(price)
}

/// Validate a charge rate entered by the user
pub fn validate_rate(field: &'static str, value: f64) -> Result<f64, FieldError> {
    if !value.is_finite() {
        return Err(FieldError::RateNotFinite { field });
    }
    if !(MIN_RATE_PERCENT..=MAX_RATE_PERCENT).contains(&value) {
        return Err(FieldError::RateOutOfRange { field, value });
    }
    Ok(value)
}
