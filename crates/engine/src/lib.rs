//! Reactive validation engine for the card payment form.
//!
//! Raw field text enters through the sinks on [`FormHandle`] and flows
//! through per-field pipelines (normalize → validate → gate-by-blur), the
//! form-wide aggregator, and, on submit, the submission coordinator:
//!
//! - [`signal`] — current-value signals over `tokio::sync::watch`.
//! - [`field`] — per-field pipelines and their output signals.
//! - [`aggregate`] — form validity and the current snapshot.
//! - [`gateway`] — the pluggable [`PaymentGateway`] and its simulated form.
//! - [`bus`] — broadcast of [`SubmissionEvent`]s.
//! - [`engine`] — [`FormEngine`] lifecycle and the [`FormHandle`].
//! - [`config`] — [`EngineConfig`] loaded from the environment.
//!
//! ```no_run
//! use cardform_engine::{EngineConfig, FormEngine};
//!
//! # async fn demo() -> Result<(), cardform_engine::EngineError> {
//! let mut engine = FormEngine::simulated(EngineConfig::default());
//! let form = engine.start()?;
//!
//! form.submit_card_number_input("4111 1111 1111 1111");
//! form.submit_card_number_blur();
//! assert!(!form.card_number().show_error.get());
//!
//! engine.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod bus;
pub mod config;
pub mod engine;
pub mod field;
pub mod gateway;
pub mod signal;
mod submission;

pub use bus::{RejectReason, SubmissionBus, SubmissionEvent};
pub use config::{ConfigError, EngineConfig, SubmitPolicy};
pub use engine::{EngineError, FormEngine, FormHandle};
pub use field::FieldSignals;
pub use gateway::{PaymentError, PaymentGateway, PaymentReceipt, SimulatedGateway, SubmissionId};
pub use signal::Signal;
