//! Per-field error visibility.
//!
//! A field's error is shown only once the field has been left at least once.
//! The two inputs to that decision, the current error text and the blurred
//! flag, arrive from independent sources. They are merged into a single
//! stream of [`FieldEvent`]s and folded into one [`FieldState`] by
//! [`FieldState::apply`], so neither source ever writes the other's half.

use serde::{Deserialize, Serialize};

/// One update from either of the two sources feeding a field's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldEvent {
    /// The field's error text was recomputed (`""` = valid).
    ErrorMessage(String),
    /// The field's blurred flag ticked.
    Blurred(bool),
}

/// The fold accumulator for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldState {
    pub error_message: String,
    pub blurred_once: bool,
}

impl FieldState {
    /// Apply one event, leaving the other half of the record untouched.
    ///
    /// The blurred flag is monotonic: a `Blurred(false)` never clears it.
    #[must_use]
    pub fn apply(self, event: FieldEvent) -> Self {
        match event {
            FieldEvent::ErrorMessage(error_message) => Self {
                error_message,
                ..self
            },
            FieldEvent::Blurred(blurred) => Self {
                blurred_once: self.blurred_once || blurred,
                ..self
            },
        }
    }

    /// Whether the error should be displayed right now.
    pub fn show_error(&self) -> bool {
        !self.error_message.is_empty() && self.blurred_once
    }
}

/// Fold a sequence of events from the initial state.
pub fn fold_events<I>(events: I) -> FieldState
where
    I: IntoIterator<Item = FieldEvent>,
{
    events
        .into_iter()
        .fold(FieldState::default(), FieldState::apply)
}
