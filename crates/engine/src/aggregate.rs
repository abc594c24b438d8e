//! Form-wide signals derived from all three fields.
//!
//! Validity is computed from the fields' error signals, not their
//! `show_error` gates, so an untouched invalid field still blocks submission.

use cardform_core::{FormSnapshot, NormalizedValue};

use crate::field::FieldPipeline;
use crate::signal::{Signal, SignalCell};

/// Whether any of the given error messages is non-empty.
pub fn any_invalid<'a, I>(errors: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    errors.into_iter().any(|e| !e.is_empty())
}

/// Combine normalized values positionally into one snapshot.
pub fn combine_snapshot<'a, I>(values: I) -> FormSnapshot
where
    I: IntoIterator<Item = &'a NormalizedValue>,
{
    values
        .into_iter()
        .fold(FormSnapshot::default(), FormSnapshot::with_value)
}

pub(crate) struct Aggregator {
    is_form_invalid: SignalCell<bool>,
    form_snapshot: SignalCell<FormSnapshot>,
}

impl Aggregator {
    pub fn new(fields: &[&FieldPipeline]) -> Self {
        let aggregator = Self {
            is_form_invalid: SignalCell::new(true),
            form_snapshot: SignalCell::new(FormSnapshot::default()),
        };
        aggregator.recompute_validity(fields);
        aggregator.recompute_snapshot(fields);
        aggregator
    }

    pub fn is_form_invalid(&self) -> Signal<bool> {
        self.is_form_invalid.signal()
    }

    pub fn form_snapshot(&self) -> Signal<FormSnapshot> {
        self.form_snapshot.signal()
    }

    pub fn current_invalid(&self) -> bool {
        self.is_form_invalid.get()
    }

    pub fn current_snapshot(&self) -> FormSnapshot {
        self.form_snapshot.get()
    }

    pub fn recompute_validity(&self, fields: &[&FieldPipeline]) {
        let errors: Vec<String> = fields.iter().map(|f| f.error()).collect();
        let invalid = any_invalid(errors.iter().map(String::as_str));
        if self.is_form_invalid.set(invalid) {
            tracing::debug!(is_form_invalid = invalid, "Form validity changed");
        }
    }

    pub fn recompute_snapshot(&self, fields: &[&FieldPipeline]) {
        let values: Vec<NormalizedValue> = fields.iter().map(|f| f.normalized()).collect();
        let snapshot = combine_snapshot(&values);
        if self.form_snapshot.set(snapshot) {
            tracing::debug!("Form snapshot updated");
        }
    }
}
