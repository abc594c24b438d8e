//! Payment gateway capability.
//!
//! The submission coordinator hands every accepted snapshot to a
//! [`PaymentGateway`]. [`SimulatedGateway`] stands in for a network round
//! trip with a fixed delay and always succeeds.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use cardform_core::FormSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SubmissionId
// ---------------------------------------------------------------------------

/// Identifies one submit edge. Strictly increasing per engine, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(u64);

impl SubmissionId {
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PaymentReceipt / PaymentError
// ---------------------------------------------------------------------------

/// Proof that a payment went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub submission_id: SubmissionId,
    pub payment_id: Uuid,
    /// Card number with all but the last four characters hidden.
    pub masked_card: String,
    pub completed_at: DateTime<Utc>,
}

impl PaymentReceipt {
    /// Issue a fresh receipt for a snapshot.
    pub fn issue(submission_id: SubmissionId, snapshot: &FormSnapshot) -> Self {
        Self {
            submission_id,
            payment_id: Uuid::new_v4(),
            masked_card: snapshot.masked_card(),
            completed_at: Utc::now(),
        }
    }
}

/// Why a gateway could not complete a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum PaymentError {
    /// The payment provider refused the card.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The payment provider could not be reached.
    #[error("Payment provider unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// PaymentGateway
// ---------------------------------------------------------------------------

/// Something that can take a form snapshot and charge it.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn submit(
        &self,
        submission_id: SubmissionId,
        snapshot: &FormSnapshot,
    ) -> Result<PaymentReceipt, PaymentError>;
}

/// Resolves every payment successfully after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    delay: Duration,
}

impl SimulatedGateway {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn submit(
        &self,
        submission_id: SubmissionId,
        snapshot: &FormSnapshot,
    ) -> Result<PaymentReceipt, PaymentError> {
        tracing::debug!(
            %submission_id,
            payload_bytes = snapshot.to_payload().to_string().len(),
            delay = ?self.delay,
            "Simulated payment in flight",
        );
        tokio::time::sleep(self.delay).await;
        Ok(PaymentReceipt::issue(submission_id, snapshot))
    }
}
