//! In-process submission event bus backed by a `tokio::sync::broadcast`
//! channel.
//!
//! Every submit edge ends in exactly one [`SubmissionEvent`] on the
//! [`SubmissionBus`]: a completed payment, a failed one, or a rejection.

use std::fmt;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::gateway::{PaymentError, PaymentReceipt, SubmissionId};

// ---------------------------------------------------------------------------
// SubmissionEvent
// ---------------------------------------------------------------------------

/// Why a submit edge was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// At least one field held an error at the moment of submission.
    FormInvalid,
    /// Another submission was still in flight.
    SubmissionPending,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::FormInvalid => f.write_str("form has validation errors"),
            RejectReason::SubmissionPending => f.write_str("a submission is already pending"),
        }
    }
}

/// The outcome of one submit edge.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmissionEvent {
    Completed {
        submission_id: SubmissionId,
        receipt: PaymentReceipt,
    },
    Failed {
        submission_id: SubmissionId,
        error: PaymentError,
    },
    Rejected {
        submission_id: SubmissionId,
        reason: RejectReason,
    },
}

impl SubmissionEvent {
    pub fn submission_id(&self) -> SubmissionId {
        match self {
            Self::Completed { submission_id, .. }
            | Self::Failed { submission_id, .. }
            | Self::Rejected { submission_id, .. } => *submission_id,
        }
    }

    /// Event type name for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Rejected { .. } => "rejected",
        }
    }
}

// ---------------------------------------------------------------------------
// SubmissionBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 64;

/// Fan-out hub for [`SubmissionEvent`]s.
pub struct SubmissionBus {
    sender: broadcast::Sender<SubmissionEvent>,
}

impl SubmissionBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: SubmissionEvent) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.sender.subscribe()
    }
}

impl Default for SubmissionBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
