//! Field validation rules.
//!
//! Each validator checks its rules in a fixed order (emptiness, then
//! shape/length, then numeric content) and reports only the first failure.
//! A `None` result means the value is valid.

use crate::types::{ExpiryParts, NormalizedValue};

/// Required card number length, in characters.
pub const CARD_NUMBER_LENGTH: usize = 16;

/// Required length of each expiry part (`MM` and `YY`).
pub const EXPIRY_PART_LENGTH: usize = 2;

/// Required number of expiry parts.
pub const EXPIRY_PART_COUNT: usize = 2;

/// Required CVC length, in characters.
pub const CVC_LENGTH: usize = 3;

/// The first rule a field value fails.
///
/// The `Display` text is what the error signal carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("There is no card number")]
    MissingCardNumber,

    #[error("There should be 16 characters in a card number")]
    CardNumberLength,

    #[error("There is no expiry. Format MM-YY")]
    MissingExpiry,

    #[error("Expiry must be formatted like MM-YY")]
    ExpiryFormat,

    #[error("There is no CVC")]
    MissingCvc,

    #[error("The CVC must be 3 numbers")]
    CvcLength,

    #[error("The CVC must be numbers")]
    CvcNotNumeric,
}

/// Validate a normalized card number.
pub fn validate_card_number(card_number: &str) -> Option<FieldError> {
    if card_number.is_empty() {
        return Some(FieldError::MissingCardNumber);
    }
    if card_number.chars().count() != CARD_NUMBER_LENGTH {
        return Some(FieldError::CardNumberLength);
    }
    None
}

/// Validate a normalized expiry.
///
/// Month and year ranges are not checked.
pub fn validate_expiry(expiry: &ExpiryParts) -> Option<FieldError> {
    let parts = expiry.parts();

    if parts.iter().all(String::is_empty) {
        return Some(FieldError::MissingExpiry);
    }
    if parts.len() != EXPIRY_PART_COUNT
        || parts
            .iter()
            .any(|part| part.chars().count() != EXPIRY_PART_LENGTH)
    {
        return Some(FieldError::ExpiryFormat);
    }
    None
}

/// Validate a normalized CVC.
///
/// Length is checked before content, so `"12a"` reports a numeric error and
/// `"1a"` a length error.
pub fn validate_cvc(cvc: &str) -> Option<FieldError> {
    if cvc.is_empty() {
        return Some(FieldError::MissingCvc);
    }
    if cvc.chars().count() != CVC_LENGTH {
        return Some(FieldError::CvcLength);
    }
    if !cvc.chars().all(|c| c.is_ascii_digit()) {
        return Some(FieldError::CvcNotNumeric);
    }
    None
}

/// Validate any normalized value with the rules of its field.
pub fn validate(value: &NormalizedValue) -> Option<FieldError> {
    match value {
        NormalizedValue::CardNumber(s) => validate_card_number(s),
        NormalizedValue::Expiry(parts) => validate_expiry(parts),
        NormalizedValue::Cvc(s) => validate_cvc(s),
    }
}

/// The error signal text for a value: the failure reason, or `""` if valid.
pub fn error_message(value: &NormalizedValue) -> String {
    validate(value).map(|e| e.to_string()).unwrap_or_default()
}
