//! Form engine lifecycle and the handle the hosting UI talks to.
//!
//! [`FormEngine::start`] wires a fresh dataflow graph (three field pipelines,
//! the aggregator and the submission coordinator) and returns a
//! [`FormHandle`]. The handle exposes the input sinks and output signals and
//! can be cloned into as many UI callbacks as needed. [`FormEngine::stop`]
//! tears the graph down.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cardform_core::{FieldKind, FormSnapshot};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::aggregate::Aggregator;
use crate::bus::{SubmissionBus, SubmissionEvent};
use crate::config::EngineConfig;
use crate::field::{FieldPipeline, FieldSignals};
use crate::gateway::{PaymentError, PaymentGateway, SimulatedGateway, SubmissionId};
use crate::signal::Signal;
use crate::submission::SubmissionCoordinator;

/// Errors that can occur when starting the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `start()` was called outside a Tokio runtime.
    #[error("No Tokio runtime available to run payment submissions")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

// ---------------------------------------------------------------------------
// FormGraph
// ---------------------------------------------------------------------------

struct FormGraph {
    card_number: FieldPipeline,
    expiry: FieldPipeline,
    cvc: FieldPipeline,
    aggregate: Aggregator,
    coordinator: SubmissionCoordinator,
    bus: Arc<SubmissionBus>,
    cancel: CancellationToken,
    /// Serializes sink calls so a field's signals and the aggregate are
    /// always written as one unit.
    writes: Mutex<()>,
}

impl FormGraph {
    fn lock(&self) -> MutexGuard<'_, ()> {
        // `()` holds no state a panic could corrupt.
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn field(&self, kind: FieldKind) -> &FieldPipeline {
        match kind {
            FieldKind::CardNumber => &self.card_number,
            FieldKind::Expiry => &self.expiry,
            FieldKind::Cvc => &self.cvc,
        }
    }

    fn fields(&self) -> [&FieldPipeline; 3] {
        [&self.card_number, &self.expiry, &self.cvc]
    }
}

// ---------------------------------------------------------------------------
// FormHandle
// ---------------------------------------------------------------------------

/// Sinks and signals of one running form.
///
/// After the owning engine is stopped every sink becomes a no-op; signals
/// keep returning their last values.
#[derive(Clone)]
pub struct FormHandle {
    graph: Arc<FormGraph>,
}

impl FormHandle {
    // ---- input sinks ----

    /// Push raw text into a field. `None` is treated as empty input.
    pub fn push_input(&self, kind: FieldKind, raw: Option<&str>) {
        if self.is_stopped() {
            tracing::debug!(field = %kind, "Ignoring input after stop");
            return;
        }

        let _guard = self.graph.lock();
        let fields = self.graph.fields();
        let change = self.graph.field(kind).push_input(raw.unwrap_or_default());
        if change.normalized {
            self.graph.aggregate.recompute_snapshot(&fields);
        }
        if change.error {
            self.graph.aggregate.recompute_validity(&fields);
        }
    }

    /// Record that a field lost focus.
    pub fn push_blur(&self, kind: FieldKind) {
        if self.is_stopped() {
            tracing::debug!(field = %kind, "Ignoring blur after stop");
            return;
        }
        let _guard = self.graph.lock();
        self.graph.field(kind).push_blur();
    }

    pub fn submit_card_number_input(&self, text: &str) {
        self.push_input(FieldKind::CardNumber, Some(text));
    }

    pub fn submit_expiry_input(&self, text: &str) {
        self.push_input(FieldKind::Expiry, Some(text));
    }

    pub fn submit_cvc_input(&self, text: &str) {
        self.push_input(FieldKind::Cvc, Some(text));
    }

    pub fn submit_card_number_blur(&self) {
        self.push_blur(FieldKind::CardNumber);
    }

    pub fn submit_expiry_blur(&self) {
        self.push_blur(FieldKind::Expiry);
    }

    pub fn submit_cvc_blur(&self) {
        self.push_blur(FieldKind::Cvc);
    }

    /// Push a submit edge.
    ///
    /// Returns the id under which the outcome will be published, or `None`
    /// if the engine has been stopped.
    pub fn submit_form(&self) -> Option<SubmissionId> {
        if self.is_stopped() {
            tracing::debug!("Ignoring submit after stop");
            return None;
        }
        let (snapshot, invalid) = {
            let _guard = self.graph.lock();
            (
                self.graph.aggregate.current_snapshot(),
                self.graph.aggregate.current_invalid(),
            )
        };
        Some(self.graph.coordinator.submit(snapshot, invalid))
    }

    // ---- output signals ----

    pub fn field(&self, kind: FieldKind) -> FieldSignals {
        self.graph.field(kind).signals()
    }

    pub fn card_number(&self) -> FieldSignals {
        self.field(FieldKind::CardNumber)
    }

    pub fn expiry(&self) -> FieldSignals {
        self.field(FieldKind::Expiry)
    }

    pub fn cvc(&self) -> FieldSignals {
        self.field(FieldKind::Cvc)
    }

    pub fn is_form_invalid(&self) -> Signal<bool> {
        self.graph.aggregate.is_form_invalid()
    }

    pub fn form_snapshot(&self) -> Signal<FormSnapshot> {
        self.graph.aggregate.form_snapshot()
    }

    /// Number of payments currently in flight.
    pub fn pending_submissions(&self) -> Signal<usize> {
        self.graph.coordinator.pending_submissions()
    }

    /// The most recent gateway failure, if any.
    pub fn last_payment_error(&self) -> Signal<Option<PaymentError>> {
        self.graph.coordinator.last_payment_error()
    }

    /// Subscribe to submission outcomes, one event per submit edge.
    pub fn payment_events(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.graph.bus.subscribe()
    }

    pub fn is_stopped(&self) -> bool {
        self.graph.cancel.is_cancelled()
    }
}

impl fmt::Debug for FormHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormHandle")
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// FormEngine
// ---------------------------------------------------------------------------

struct Running {
    handle: FormHandle,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

/// Owns the lifecycle of one form's dataflow graph.
///
/// Each engine has its own channels; any number can coexist.
pub struct FormEngine {
    config: EngineConfig,
    gateway: Arc<dyn PaymentGateway>,
    running: Option<Running>,
}

impl FormEngine {
    pub fn new(config: EngineConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            config,
            gateway,
            running: None,
        }
    }

    /// An engine backed by [`SimulatedGateway`] using the configured delay.
    pub fn simulated(config: EngineConfig) -> Self {
        let gateway = Arc::new(SimulatedGateway::new(config.payment_delay));
        Self::new(config, gateway)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Wire the graph and return its handle.
    ///
    /// Calling `start` on a running engine returns the existing handle.
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<FormHandle, EngineError> {
        if let Some(running) = &self.running {
            return Ok(running.handle.clone());
        }

        let runtime = Handle::try_current()?;
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let bus = Arc::new(SubmissionBus::new(self.config.event_capacity));

        let card_number = FieldPipeline::new(FieldKind::CardNumber);
        let expiry = FieldPipeline::new(FieldKind::Expiry);
        let cvc = FieldPipeline::new(FieldKind::Cvc);
        let aggregate = Aggregator::new(&[&card_number, &expiry, &cvc]);

        let coordinator = SubmissionCoordinator::new(
            Arc::clone(&self.gateway),
            self.config.submit_policy,
            self.config.block_invalid_submit,
            Arc::clone(&bus),
            tracker.clone(),
            runtime,
            cancel.clone(),
        );

        let handle = FormHandle {
            graph: Arc::new(FormGraph {
                card_number,
                expiry,
                cvc,
                aggregate,
                coordinator,
                bus,
                cancel: cancel.clone(),
                writes: Mutex::new(()),
            }),
        };

        tracing::info!(
            submit_policy = %self.config.submit_policy,
            block_invalid_submit = self.config.block_invalid_submit,
            "Form engine started",
        );

        self.running = Some(Running {
            handle: handle.clone(),
            tracker,
            cancel,
        });
        Ok(handle)
    }

    /// Tear the graph down.
    ///
    /// Cancels in-flight payments, makes all sinks inert, and waits up to
    /// the configured shutdown timeout for submission tasks to exit. Safe to
    /// call when never started or already stopped.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            tracing::debug!("Form engine not running, nothing to stop");
            return;
        };

        tracing::info!("Stopping form engine");
        running.cancel.cancel();
        running.tracker.close();

        if tokio::time::timeout(self.config.shutdown_timeout, running.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = running.tracker.len(),
                "Timed out waiting for submission tasks",
            );
        }

        tracing::info!("Form engine stopped");
    }
}

impl Drop for FormEngine {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}
