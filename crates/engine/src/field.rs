//! Per-field derivation pipeline: clean → validate → gate-by-blur.
//!
//! Raw input and blur notifications both end up as [`FieldEvent`]s applied
//! by a single reducer call, the one place a field's [`FieldState`] is
//! written. Events are applied in the order the sinks are called.
//!
//! A pipeline writes its signals one after another; callers must serialize
//! `push_input` and `push_blur` on the same pipeline.

use cardform_core::normalize::{mask_card_number, normalize_field};
use cardform_core::validation::error_message;
use cardform_core::{FieldEvent, FieldKind, FieldState, NormalizedValue};

use crate::signal::{Signal, SignalCell};

/// Output signals of one field.
#[derive(Debug, Clone)]
pub struct FieldSignals {
    pub normalized_value: Signal<NormalizedValue>,
    /// Current error text, `""` when valid.
    pub error_message: Signal<String>,
    /// `true` once the field has been blurred and while it holds an error.
    pub show_error: Signal<bool>,
    /// The folded `{error_message, blurred_once}` record.
    pub state: Signal<FieldState>,
}

/// Which downstream values a field update touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FieldChange {
    pub normalized: bool,
    pub error: bool,
}

pub(crate) struct FieldPipeline {
    kind: FieldKind,
    normalized: SignalCell<NormalizedValue>,
    error_message: SignalCell<String>,
    state: SignalCell<FieldState>,
    show_error: SignalCell<bool>,
}

impl FieldPipeline {
    /// Build the pipeline and run the empty initial input through it, so the
    /// error signal starts out describing an empty field.
    pub fn new(kind: FieldKind) -> Self {
        let pipeline = Self {
            kind,
            normalized: SignalCell::new(NormalizedValue::initial(kind)),
            error_message: SignalCell::new(String::new()),
            state: SignalCell::new(FieldState::default()),
            show_error: SignalCell::new(false),
        };
        pipeline.push_input("");
        pipeline
    }

    pub fn signals(&self) -> FieldSignals {
        FieldSignals {
            normalized_value: self.normalized.signal(),
            error_message: self.error_message.signal(),
            show_error: self.show_error.signal(),
            state: self.state.signal(),
        }
    }

    pub fn normalized(&self) -> NormalizedValue {
        self.normalized.get()
    }

    pub fn error(&self) -> String {
        self.error_message.get()
    }

    /// Feed one raw value through normalize and validate, then fold the
    /// resulting error into the field state.
    pub fn push_input(&self, raw: &str) -> FieldChange {
        let value = normalize_field(self.kind, raw);
        let message = error_message(&value);

        tracing::debug!(field = %self.kind, stage = "normalized", value = %loggable(&value));
        tracing::debug!(field = %self.kind, stage = "validated", error = %message);

        let change = FieldChange {
            normalized: self.normalized.set(value),
            error: self.error_message.set(message.clone()),
        };
        self.dispatch(FieldEvent::ErrorMessage(message));
        change
    }

    /// Record that the field lost focus.
    pub fn push_blur(&self) {
        tracing::debug!(field = %self.kind, stage = "blurred");
        self.dispatch(FieldEvent::Blurred(true));
    }

    /// Apply an event to the field state and refresh the gate.
    fn dispatch(&self, event: FieldEvent) {
        let mut show = false;
        self.state.update(|state| {
            let next = state.clone().apply(event);
            show = next.show_error();
            if next == *state {
                return false;
            }
            *state = next;
            true
        });

        if self.show_error.set(show) {
            tracing::debug!(field = %self.kind, stage = "gated", show_error = show);
        }
    }
}

/// Render a value for logs without exposing the full card number.
fn loggable(value: &NormalizedValue) -> String {
    match value {
        NormalizedValue::CardNumber(s) => mask_card_number(s),
        other => other.to_string(),
    }
}
