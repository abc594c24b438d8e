//! Field kinds, normalized values and the form snapshot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::normalize::mask_card_number;

// ---------------------------------------------------------------------------
// FieldKind
// ---------------------------------------------------------------------------

/// One of the three inputs on the payment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    CardNumber,
    Expiry,
    Cvc,
}

impl FieldKind {
    /// All fields in form order.
    pub const ALL: [FieldKind; 3] = [FieldKind::CardNumber, FieldKind::Expiry, FieldKind::Cvc];

    /// Stable snake_case name used in logs and on the console.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::CardNumber => "card_number",
            FieldKind::Expiry => "expiry",
            FieldKind::Cvc => "cvc",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = CoreError;

    /// Accepts the snake_case name plus the short aliases `card` and `number`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card_number" | "card" | "number" => Ok(FieldKind::CardNumber),
            "expiry" => Ok(FieldKind::Expiry),
            "cvc" => Ok(FieldKind::Cvc),
            other => Err(CoreError::UnknownField(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ExpiryParts
// ---------------------------------------------------------------------------

/// The expiry field split into its parts, normally `[month, year]`.
///
/// The part count is preserved as typed so that malformed input such as
/// `"1-2-3"` can be reported instead of silently truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpiryParts {
    parts: Vec<String>,
}

impl ExpiryParts {
    pub fn new(parts: Vec<String>) -> Self {
        Self { parts }
    }

    /// The empty `["", ""]` pair.
    pub fn empty() -> Self {
        Self::new(vec![String::new(), String::new()])
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn month(&self) -> &str {
        self.parts.first().map(String::as_str).unwrap_or("")
    }

    pub fn year(&self) -> &str {
        self.parts.get(1).map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for ExpiryParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("-"))
    }
}

// ---------------------------------------------------------------------------
// NormalizedValue
// ---------------------------------------------------------------------------

/// A field value with formatting characters removed.
///
/// Serializes untagged: a plain string for card number and CVC, an array for
/// expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    CardNumber(String),
    Expiry(ExpiryParts),
    Cvc(String),
}

impl NormalizedValue {
    /// The value a field holds before any input has arrived.
    pub fn initial(kind: FieldKind) -> Self {
        match kind {
            FieldKind::CardNumber => NormalizedValue::CardNumber(String::new()),
            FieldKind::Expiry => NormalizedValue::Expiry(ExpiryParts::empty()),
            FieldKind::Cvc => NormalizedValue::Cvc(String::new()),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            NormalizedValue::CardNumber(_) => FieldKind::CardNumber,
            NormalizedValue::Expiry(_) => FieldKind::Expiry,
            NormalizedValue::Cvc(_) => FieldKind::Cvc,
        }
    }

    /// The text of a card number or CVC value; `None` for expiry.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NormalizedValue::CardNumber(s) | NormalizedValue::Cvc(s) => Some(s),
            NormalizedValue::Expiry(_) => None,
        }
    }

    pub fn as_expiry(&self) -> Option<&ExpiryParts> {
        match self {
            NormalizedValue::Expiry(parts) => Some(parts),
            _ => None,
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedValue::CardNumber(s) | NormalizedValue::Cvc(s) => f.write_str(s),
            NormalizedValue::Expiry(parts) => write!(f, "{parts}"),
        }
    }
}

// ---------------------------------------------------------------------------
// FormSnapshot
// ---------------------------------------------------------------------------

/// The normalized values of all three fields at one instant.
///
/// A snapshot may hold invalid values; validity is tracked by a separate
/// signal and checked by the submission gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub card_number: String,
    pub expiry: ExpiryParts,
    pub cvc: String,
}

impl Default for FormSnapshot {
    fn default() -> Self {
        Self {
            card_number: String::new(),
            expiry: ExpiryParts::empty(),
            cvc: String::new(),
        }
    }
}

impl FormSnapshot {
    /// Replace the slot matching the value's field.
    pub fn with_value(mut self, value: &NormalizedValue) -> Self {
        match value {
            NormalizedValue::CardNumber(s) => self.card_number = s.clone(),
            NormalizedValue::Expiry(parts) => self.expiry = parts.clone(),
            NormalizedValue::Cvc(s) => self.cvc = s.clone(),
        }
        self
    }

    /// JSON body forwarded to a payment gateway.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "cardNumber": self.card_number,
            "expiry": self.expiry,
            "cvc": self.cvc,
        })
    }

    /// The card number with all but the last four characters hidden.
    pub fn masked_card(&self) -> String {
        mask_card_number(&self.card_number)
    }
}
