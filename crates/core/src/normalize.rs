//! Raw field text normalization.
//!
//! Every function here is total: any string, including the empty one, maps
//! to a normalized value. Callers holding an absent value pass `""`.

use crate::types::{ExpiryParts, FieldKind, NormalizedValue};

/// Number of characters at which an unhyphenated expiry is split.
const EXPIRY_SPLIT_AT: usize = 2;

/// Number of trailing card characters left visible by [`mask_card_number`].
const VISIBLE_CARD_SUFFIX: usize = 4;

fn is_formatting(c: char) -> bool {
    c.is_whitespace() || c == '-'
}

/// Remove whitespace and hyphens from a card number.
///
/// ```
/// use cardform_core::normalize::normalize_card_number;
///
/// assert_eq!(normalize_card_number("4111 1111-1111 1111"), "4111111111111111");
/// ```
pub fn normalize_card_number(raw: &str) -> String {
    raw.chars().filter(|c| !is_formatting(*c)).collect()
}

/// Remove whitespace and hyphens from a CVC.
pub fn normalize_cvc(raw: &str) -> String {
    raw.chars().filter(|c| !is_formatting(*c)).collect()
}

/// Split an expiry into its parts.
///
/// Whitespace is stripped first. A hyphenated value is split on every
/// hyphen (`"1-25"` gives `["1", "25"]`); otherwise the value is split after
/// its second character (`"1225"` gives `["12", "25"]`). An empty value
/// gives `["", ""]`.
pub fn normalize_expiry(raw: &str) -> ExpiryParts {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.contains('-') {
        return ExpiryParts::new(compact.split('-').map(str::to_owned).collect());
    }

    let boundary = compact
        .char_indices()
        .nth(EXPIRY_SPLIT_AT)
        .map(|(idx, _)| idx)
        .unwrap_or(compact.len());
    let (month, year) = compact.split_at(boundary);

    ExpiryParts::new(vec![month.to_owned(), year.to_owned()])
}

/// Normalize raw text for the given field.
pub fn normalize_field(kind: FieldKind, raw: &str) -> NormalizedValue {
    match kind {
        FieldKind::CardNumber => NormalizedValue::CardNumber(normalize_card_number(raw)),
        FieldKind::Expiry => NormalizedValue::Expiry(normalize_expiry(raw)),
        FieldKind::Cvc => NormalizedValue::Cvc(normalize_cvc(raw)),
    }
}

/// Hide all but the last four characters of a card number.
pub fn mask_card_number(card_number: &str) -> String {
    let total = card_number.chars().count();
    let hidden = total.saturating_sub(VISIBLE_CARD_SUFFIX);

    card_number
        .chars()
        .enumerate()
        .map(|(i, c)| if i < hidden { '*' } else { c })
        .collect()
}
