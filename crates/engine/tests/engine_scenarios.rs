//! End-to-end scenarios for the form engine.
//!
//! Each test builds its own engine, so no state leaks between cases.
//! Payment delays run on Tokio's paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use cardform_core::{ExpiryParts, FieldKind, FieldState, FormSnapshot, NormalizedValue};
use cardform_engine::{
    EngineConfig, EngineError, FormEngine, FormHandle, PaymentError, PaymentGateway,
    PaymentReceipt, RejectReason, SubmissionEvent, SubmissionId, SubmitPolicy,
};
use tokio::sync::broadcast::error::TryRecvError;

const VALID_CARD: &str = "4111 1111-1111 1111";
const DELAY: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Test gateways
// ---------------------------------------------------------------------------

/// Records every call and succeeds after a fixed delay.
struct RecordingGateway {
    delay: Duration,
    calls: Mutex<Vec<(SubmissionId, FormSnapshot)>>,
}

impl RecordingGateway {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(SubmissionId, FormSnapshot)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn submit(
        &self,
        submission_id: SubmissionId,
        snapshot: &FormSnapshot,
    ) -> Result<PaymentReceipt, PaymentError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((submission_id, snapshot.clone()));
        tokio::time::sleep(self.delay).await;
        Ok(PaymentReceipt::issue(submission_id, snapshot))
    }
}

/// Declines every payment immediately.
struct DecliningGateway;

#[async_trait]
impl PaymentGateway for DecliningGateway {
    async fn submit(
        &self,
        _submission_id: SubmissionId,
        _snapshot: &FormSnapshot,
    ) -> Result<PaymentReceipt, PaymentError> {
        Err(PaymentError::Declined("insufficient funds".into()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config() -> EngineConfig {
    EngineConfig {
        payment_delay: DELAY,
        ..EngineConfig::default()
    }
}

fn engine_with(config: EngineConfig, gateway: Arc<dyn PaymentGateway>) -> FormEngine {
    FormEngine::new(config, gateway)
}

fn fill_valid(form: &FormHandle) {
    form.submit_card_number_input(VALID_CARD);
    form.submit_expiry_input("12-25");
    form.submit_cvc_input("123");
}

fn expected_snapshot() -> FormSnapshot {
    FormSnapshot {
        card_number: "4111111111111111".into(),
        expiry: ExpiryParts::new(vec!["12".into(), "25".into()]),
        cvc: "123".into(),
    }
}

// ---------------------------------------------------------------------------
// Field signals
// ---------------------------------------------------------------------------

#[tokio::test]
async fn errors_are_hidden_right_after_start() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");

    for kind in FieldKind::ALL {
        let signals = form.field(kind);
        assert_ne!(signals.error_message.get(), "", "{kind} starts invalid");
        assert!(!signals.show_error.get(), "{kind} hides its error");
    }
    assert!(form.is_form_invalid().get());

    engine.stop().await;
}

#[tokio::test]
async fn formatted_card_number_normalizes_and_validates() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");

    form.submit_card_number_input(VALID_CARD);

    let card = form.card_number();
    assert_eq!(
        card.normalized_value.get(),
        NormalizedValue::CardNumber("4111111111111111".into())
    );
    assert_eq!(card.error_message.get(), "");
    assert!(!card.show_error.get());
}

#[tokio::test]
async fn short_card_number_shows_error_after_blur() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");

    form.submit_card_number_input("123");
    assert!(!form.card_number().show_error.get());

    form.submit_card_number_blur();
    let card = form.card_number();
    assert_eq!(
        card.error_message.get(),
        "There should be 16 characters in a card number"
    );
    assert!(card.show_error.get());
}

#[tokio::test]
async fn cvc_with_letter_reports_numeric_error() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");

    form.submit_cvc_input("12a");
    assert_eq!(form.cvc().error_message.get(), "The CVC must be numbers");
}

#[tokio::test]
async fn single_digit_month_reports_format_error() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");

    form.submit_expiry_input("1-25");

    let expiry = form.expiry();
    assert_eq!(
        expiry.normalized_value.get(),
        NormalizedValue::Expiry(ExpiryParts::new(vec!["1".into(), "25".into()]))
    );
    assert_eq!(expiry.error_message.get(), "Expiry must be formatted like MM-YY");
}

#[tokio::test]
async fn absent_input_counts_as_empty() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");

    form.submit_cvc_input("123");
    form.push_input(FieldKind::Cvc, None);
    assert_eq!(form.cvc().error_message.get(), "There is no CVC");
}

#[tokio::test]
async fn blur_and_input_order_yield_same_state() {
    let mut first = FormEngine::simulated(config());
    let a = first.start().expect("engine should start");
    a.submit_expiry_blur();
    a.submit_expiry_input("1225");

    let mut second = FormEngine::simulated(config());
    let b = second.start().expect("engine should start");
    b.submit_expiry_input("1225");
    b.submit_expiry_blur();

    assert_eq!(a.expiry().state.get(), b.expiry().state.get());
    assert_eq!(
        a.expiry().state.get(),
        FieldState {
            error_message: String::new(),
            blurred_once: true,
        }
    );
}

#[tokio::test]
async fn after_blur_show_error_follows_error_message() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");
    form.submit_cvc_blur();

    for raw in ["", "1", "123", "12a", "123", "999"] {
        form.submit_cvc_input(raw);
        form.submit_cvc_blur();
        let cvc = form.cvc();
        assert_eq!(cvc.show_error.get(), !cvc.error_message.get().is_empty(), "input {raw:?}");
    }
}

#[tokio::test]
async fn show_error_subscribers_are_notified() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");
    let mut show = form.card_number().show_error;

    form.submit_card_number_blur();
    assert_eq!(show.changed().await, Some(true));

    form.submit_card_number_input(VALID_CARD);
    assert_eq!(show.changed().await, Some(false));
}

#[tokio::test]
async fn form_is_valid_only_when_every_field_is() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");
    let invalid = form.is_form_invalid();

    form.submit_card_number_input(VALID_CARD);
    form.submit_expiry_input("12-25");
    assert!(invalid.get());

    form.submit_cvc_input("123");
    assert!(!invalid.get());

    form.submit_expiry_input("1-25");
    assert!(invalid.get());
}

#[tokio::test]
async fn snapshot_follows_latest_values() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");

    fill_valid(&form);
    assert_eq!(form.form_snapshot().get(), expected_snapshot());

    form.submit_cvc_input("9 9 9");
    assert_eq!(form.form_snapshot().get().cvc, "999");
}

#[tokio::test]
async fn engines_do_not_share_state() {
    let mut first = FormEngine::simulated(config());
    let mut second = FormEngine::simulated(config());
    let a = first.start().expect("engine should start");
    let b = second.start().expect("engine should start");

    a.submit_card_number_input(VALID_CARD);
    assert_eq!(b.card_number().error_message.get(), "There is no card number");
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn valid_submit_dispatches_one_payment() {
    let gateway = RecordingGateway::new(DELAY);
    let mut engine = engine_with(config(), gateway.clone());
    let form = engine.start().expect("engine should start");
    let mut events = form.payment_events();

    fill_valid(&form);
    let mut card_error = form.card_number().error_message;
    let mut invalid = form.is_form_invalid();
    let mut snapshot = form.form_snapshot();
    card_error.mark_seen();
    invalid.mark_seen();
    snapshot.mark_seen();

    let started = tokio::time::Instant::now();
    let id = form.submit_form().expect("engine is running");
    assert_eq!(id, SubmissionId::from_raw(1));
    assert_eq!(form.pending_submissions().get(), 1);

    let event = events.recv().await.expect("completion event");
    assert!(started.elapsed() >= DELAY);
    assert_matches!(
        event,
        SubmissionEvent::Completed { submission_id, ref receipt }
            if submission_id == id && receipt.masked_card == "************1111"
    );

    let calls = gateway.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], (id, expected_snapshot()));

    assert_eq!(form.pending_submissions().get(), 0);
    assert!(!card_error.has_changed());
    assert!(!invalid.has_changed());
    assert!(!snapshot.has_changed());
    assert_matches!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn snapshot_is_captured_at_the_submit_edge() {
    let gateway = RecordingGateway::new(DELAY);
    let mut engine = engine_with(config(), gateway.clone());
    let form = engine.start().expect("engine should start");
    let mut events = form.payment_events();

    fill_valid(&form);
    form.submit_form().expect("engine is running");
    form.submit_card_number_input("5500 0000 0000 0004");

    assert_matches!(events.recv().await, Ok(SubmissionEvent::Completed { .. }));
    assert_eq!(gateway.calls()[0].1, expected_snapshot());
    assert_eq!(form.form_snapshot().get().card_number, "5500000000000004");
}

#[tokio::test(start_paused = true)]
async fn invalid_form_is_rejected_without_dispatch() {
    let gateway = RecordingGateway::new(DELAY);
    let mut engine = engine_with(config(), gateway.clone());
    let form = engine.start().expect("engine should start");
    let mut events = form.payment_events();

    form.submit_card_number_input(VALID_CARD);
    let id = form.submit_form().expect("engine is running");

    assert_matches!(
        events.recv().await,
        Ok(SubmissionEvent::Rejected { submission_id, reason: RejectReason::FormInvalid })
            if submission_id == id
    );
    assert!(gateway.calls().is_empty());
    assert_eq!(form.pending_submissions().get(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_form_dispatches_when_gate_disabled() {
    let gateway = RecordingGateway::new(DELAY);
    let config = EngineConfig {
        block_invalid_submit: false,
        ..config()
    };
    let mut engine = engine_with(config, gateway.clone());
    let form = engine.start().expect("engine should start");
    let mut events = form.payment_events();

    form.submit_cvc_input("12a");
    form.submit_form().expect("engine is running");

    assert_matches!(events.recv().await, Ok(SubmissionEvent::Completed { .. }));
    assert_eq!(gateway.calls()[0].1.cvc, "12a");
}

#[tokio::test(start_paused = true)]
async fn concurrent_submits_each_dispatch() {
    let gateway = RecordingGateway::new(DELAY);
    let mut engine = engine_with(config(), gateway.clone());
    let form = engine.start().expect("engine should start");
    let mut events = form.payment_events();

    fill_valid(&form);
    let first = form.submit_form().expect("engine is running");
    let second = form.submit_form().expect("engine is running");
    assert!(second > first);
    assert_eq!(form.pending_submissions().get(), 2);

    let mut completed = Vec::new();
    for _ in 0..2 {
        match events.recv().await.expect("event") {
            SubmissionEvent::Completed { submission_id, .. } => completed.push(submission_id),
            other => panic!("unexpected event {other:?}"),
        }
    }
    completed.sort();
    assert_eq!(completed, vec![first, second]);
    assert_eq!(gateway.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn reject_while_pending_blocks_duplicates() {
    let gateway = RecordingGateway::new(DELAY);
    let config = EngineConfig {
        submit_policy: SubmitPolicy::RejectWhilePending,
        ..config()
    };
    let mut engine = engine_with(config, gateway.clone());
    let form = engine.start().expect("engine should start");
    let mut events = form.payment_events();

    fill_valid(&form);
    let first = form.submit_form().expect("engine is running");
    let second = form.submit_form().expect("engine is running");

    assert_matches!(
        events.recv().await,
        Ok(SubmissionEvent::Rejected { submission_id, reason: RejectReason::SubmissionPending })
            if submission_id == second
    );
    assert_matches!(
        events.recv().await,
        Ok(SubmissionEvent::Completed { submission_id, .. }) if submission_id == first
    );

    let third = form.submit_form().expect("engine is running");
    assert_matches!(
        events.recv().await,
        Ok(SubmissionEvent::Completed { submission_id, .. }) if submission_id == third
    );
    assert_eq!(gateway.calls().len(), 2);
}

#[tokio::test]
async fn gateway_failure_is_published_and_recorded() {
    let mut engine = engine_with(config(), Arc::new(DecliningGateway));
    let form = engine.start().expect("engine should start");
    let mut events = form.payment_events();

    fill_valid(&form);
    assert_eq!(form.last_payment_error().get(), None);
    form.submit_form().expect("engine is running");

    assert_matches!(
        events.recv().await,
        Ok(SubmissionEvent::Failed { error: PaymentError::Declined(_), .. })
    );
    assert_eq!(
        form.last_payment_error().get(),
        Some(PaymentError::Declined("insufficient funds".into()))
    );

    form.submit_cvc_input("12a");
    assert_eq!(form.cvc().error_message.get(), "The CVC must be numbers");
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_without_start_is_a_no_op() {
    let mut engine = FormEngine::simulated(config());
    engine.stop().await;
    engine.stop().await;
    assert!(!engine.is_running());
}

#[tokio::test]
async fn stop_twice_is_safe_and_sinks_go_inert() {
    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");

    engine.stop().await;
    engine.stop().await;

    assert!(form.is_stopped());
    form.submit_card_number_input(VALID_CARD);
    assert_eq!(form.card_number().error_message.get(), "There is no card number");
    assert_eq!(form.submit_form(), None);
}

#[tokio::test(start_paused = true)]
async fn stop_abandons_in_flight_payments() {
    let gateway = RecordingGateway::new(Duration::from_secs(60));
    let mut engine = engine_with(config(), gateway.clone());
    let form = engine.start().expect("engine should start");
    let mut events = form.payment_events();

    fill_valid(&form);
    form.submit_form().expect("engine is running");
    tokio::task::yield_now().await;
    assert_eq!(gateway.calls().len(), 1);

    engine.stop().await;

    assert_eq!(form.pending_submissions().get(), 0);
    assert_matches!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn start_while_running_returns_the_same_graph() {
    let mut engine = FormEngine::simulated(config());
    let a = engine.start().expect("engine should start");
    let b = engine.start().expect("engine should start");

    a.submit_cvc_input("123");
    assert_eq!(b.cvc().error_message.get(), "");
}

#[tokio::test]
async fn restart_builds_a_fresh_graph() {
    let mut engine = FormEngine::simulated(config());
    let old = engine.start().expect("engine should start");
    old.submit_cvc_input("123");
    engine.stop().await;

    let new = engine.start().expect("engine should restart");
    assert!(!new.is_stopped());
    assert_eq!(new.cvc().error_message.get(), "There is no CVC");
    assert_eq!(new.submit_form(), Some(SubmissionId::from_raw(1)));
}

#[test]
fn start_outside_runtime_fails() {
    let mut engine = FormEngine::simulated(config());
    assert_matches!(engine.start(), Err(EngineError::NoRuntime(_)));
}

// ---------------------------------------------------------------------------
// Concurrent sinks
// ---------------------------------------------------------------------------

fn field_signals_agree(form: &FormHandle, kind: FieldKind) -> bool {
    let signals = form.field(kind);
    let state = signals.state.get();
    signals.error_message.get() == state.error_message
        && signals.show_error.get() == state.show_error()
}

fn form_signals_agree(form: &FormHandle) -> bool {
    let any_error = FieldKind::ALL
        .into_iter()
        .any(|kind| !form.field(kind).error_message.get().is_empty());
    form.is_form_invalid().get() == any_error
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_sinks_leave_signals_consistent() {
    const ROUNDS: usize = 2000;

    let mut engine = FormEngine::simulated(config());
    let form = engine.start().expect("engine should start");
    form.submit_card_number_input(VALID_CARD);
    form.submit_cvc_blur();
    form.submit_expiry_blur();

    let barrier = Arc::new(std::sync::Barrier::new(2));
    let writers: Vec<_> = (0..2)
        .map(|writer| {
            let form = form.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let mut broken = 0;
                for round in 0..ROUNDS {
                    barrier.wait();
                    if writer == 0 {
                        form.submit_cvc_input(if round % 2 == 0 { "12a" } else { "123" });
                    } else {
                        form.submit_cvc_input(if round % 2 == 0 { "123" } else { "1" });
                        form.submit_expiry_input(if round % 2 == 0 { "12-25" } else { "1-25" });
                    }
                    barrier.wait();
                    if writer == 0
                        && !(field_signals_agree(&form, FieldKind::Cvc)
                            && field_signals_agree(&form, FieldKind::Expiry)
                            && form_signals_agree(&form))
                    {
                        broken += 1;
                    }
                    barrier.wait();
                }
                broken
            })
        })
        .collect();

    let broken: usize = writers
        .into_iter()
        .map(|w| w.join().expect("writer thread panicked"))
        .sum();
    assert_eq!(broken, 0, "rounds ending with mismatched signals");

    engine.stop().await;
}
