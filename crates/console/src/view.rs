//! Text rendering of engine signals and submission events.

use cardform_core::normalize::mask_card_number;
use cardform_core::{FieldKind, NormalizedValue};
use cardform_engine::{FieldSignals, FormHandle, Signal, SubmissionEvent};

/// Tracks which signals have been printed so only changes are shown.
pub struct FormView {
    fields: Vec<(FieldKind, FieldSignals)>,
    invalid: Signal<bool>,
}

impl FormView {
    pub fn new(form: &FormHandle) -> Self {
        let mut view = Self {
            fields: FieldKind::ALL
                .into_iter()
                .map(|kind| (kind, form.field(kind)))
                .collect(),
            invalid: form.is_form_invalid(),
        };
        view.mark_all_seen();
        view
    }

    /// One line per field, whether or not it changed.
    pub fn render_all(&mut self) -> Vec<String> {
        self.mark_all_seen();
        let mut lines: Vec<String> = self
            .fields
            .iter()
            .map(|(kind, signals)| field_line(*kind, signals))
            .collect();
        lines.push(validity_line(self.invalid.get()));
        lines
    }

    /// Lines for the fields whose signals moved since the last render.
    pub fn render_changes(&mut self) -> Vec<String> {
        let mut lines = Vec::new();

        for (kind, signals) in &mut self.fields {
            let moved = signals.normalized_value.has_changed()
                || signals.state.has_changed()
                || signals.show_error.has_changed();
            if moved {
                lines.push(field_line(*kind, signals));
                mark_field_seen(signals);
            }
        }

        if self.invalid.has_changed() {
            lines.push(validity_line(self.invalid.get()));
            self.invalid.mark_seen();
        }

        lines
    }

    fn mark_all_seen(&mut self) {
        for (_, signals) in &mut self.fields {
            mark_field_seen(signals);
        }
        self.invalid.mark_seen();
    }
}

fn mark_field_seen(signals: &mut FieldSignals) {
    signals.normalized_value.mark_seen();
    signals.error_message.mark_seen();
    signals.show_error.mark_seen();
    signals.state.mark_seen();
}

fn field_line(kind: FieldKind, signals: &FieldSignals) -> String {
    let value = match signals.normalized_value.get() {
        NormalizedValue::CardNumber(s) => mask_card_number(&s),
        other => other.to_string(),
    };
    let error = if signals.show_error.get() {
        signals.error_message.get()
    } else {
        String::new()
    };

    if error.is_empty() {
        format!("{kind:<12} {value}")
    } else {
        format!("{kind:<12} {value}  ! {error}")
    }
}

fn validity_line(invalid: bool) -> String {
    if invalid {
        "form         incomplete".to_string()
    } else {
        "form         ready to submit".to_string()
    }
}

/// Human-readable line for a submission outcome.
pub fn event_line(event: &SubmissionEvent) -> String {
    match event {
        SubmissionEvent::Completed {
            submission_id,
            receipt,
        } => format!(
            "payment {submission_id} completed: {} (card {})",
            receipt.payment_id, receipt.masked_card
        ),
        SubmissionEvent::Failed {
            submission_id,
            error,
        } => format!("payment {submission_id} failed: {error}"),
        SubmissionEvent::Rejected {
            submission_id,
            reason,
        } => format!("submit {submission_id} rejected: {reason}"),
    }
}

/// JSON summary printed by the `status` command.
pub fn status_json(form: &FormHandle) -> serde_json::Value {
    let snapshot = form.form_snapshot().get();
    let cvc = if snapshot.cvc.is_empty() { "" } else { "***" };
    serde_json::json!({
        "cardNumber": snapshot.masked_card(),
        "expiry": snapshot.expiry,
        "cvc": cvc,
        "isFormInvalid": form.is_form_invalid().get(),
        "pendingSubmissions": form.pending_submissions().get(),
    })
}
