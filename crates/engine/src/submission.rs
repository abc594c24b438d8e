//! Submission coordinator.
//!
//! Each submit edge captures the snapshot in effect at that instant and, if
//! accepted, spawns one payment task on the engine's [`TaskTracker`]. Input
//! keeps flowing while payments are in flight. Outcomes are published on the
//! [`SubmissionBus`] and never written back into field signals.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cardform_core::FormSnapshot;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::bus::{RejectReason, SubmissionBus, SubmissionEvent};
use crate::config::SubmitPolicy;
use crate::gateway::{PaymentError, PaymentGateway, SubmissionId};
use crate::signal::{Signal, SignalCell};

pub(crate) struct SubmissionCoordinator {
    gateway: Arc<dyn PaymentGateway>,
    policy: SubmitPolicy,
    block_invalid: bool,
    /// Last issued id; ids start at 1.
    last_id: AtomicU64,
    pending: Arc<SignalCell<usize>>,
    last_error: Arc<SignalCell<Option<PaymentError>>>,
    bus: Arc<SubmissionBus>,
    tracker: TaskTracker,
    runtime: Handle,
    cancel: CancellationToken,
}

impl SubmissionCoordinator {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        policy: SubmitPolicy,
        block_invalid: bool,
        bus: Arc<SubmissionBus>,
        tracker: TaskTracker,
        runtime: Handle,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            policy,
            block_invalid,
            last_id: AtomicU64::new(0),
            pending: Arc::new(SignalCell::new(0)),
            last_error: Arc::new(SignalCell::new(None)),
            bus,
            tracker,
            runtime,
            cancel,
        }
    }

    pub fn pending_submissions(&self) -> Signal<usize> {
        self.pending.signal()
    }

    pub fn last_payment_error(&self) -> Signal<Option<PaymentError>> {
        self.last_error.signal()
    }

    /// Handle one submit edge.
    pub fn submit(&self, snapshot: FormSnapshot, form_invalid: bool) -> SubmissionId {
        let submission_id = SubmissionId::from_raw(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);

        if self.block_invalid && form_invalid {
            self.reject(submission_id, RejectReason::FormInvalid);
            return submission_id;
        }

        let policy = self.policy;
        let accepted = {
            let mut accepted = true;
            self.pending.update(|count| {
                if policy == SubmitPolicy::RejectWhilePending && *count > 0 {
                    accepted = false;
                    return false;
                }
                *count += 1;
                true
            });
            accepted
        };
        if !accepted {
            self.reject(submission_id, RejectReason::SubmissionPending);
            return submission_id;
        }

        tracing::info!(
            %submission_id,
            card = %snapshot.masked_card(),
            "Dispatching payment",
        );

        let gateway = Arc::clone(&self.gateway);
        let pending = Arc::clone(&self.pending);
        let last_error = Arc::clone(&self.last_error);
        let bus = Arc::clone(&self.bus);
        let cancel = self.cancel.clone();

        self.tracker.spawn_on(
            async move {
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = gateway.submit(submission_id, &snapshot) => Some(result),
                };

                pending.update(|count| {
                    *count = count.saturating_sub(1);
                    true
                });

                let Some(result) = outcome else {
                    tracing::info!(%submission_id, "Payment abandoned by engine shutdown");
                    return;
                };

                let event = match result {
                    Ok(receipt) => {
                        tracing::info!(
                            %submission_id,
                            payment_id = %receipt.payment_id,
                            "Payment completed",
                        );
                        SubmissionEvent::Completed {
                            submission_id,
                            receipt,
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%submission_id, error = %error, "Payment failed");
                        last_error.set(Some(error.clone()));
                        SubmissionEvent::Failed {
                            submission_id,
                            error,
                        }
                    }
                };
                bus.publish(event);
            },
            &self.runtime,
        );

        submission_id
    }

    fn reject(&self, submission_id: SubmissionId, reason: RejectReason) {
        tracing::info!(%submission_id, %reason, "Submission rejected");
        self.bus.publish(SubmissionEvent::Rejected {
            submission_id,
            reason,
        });
    }
}
