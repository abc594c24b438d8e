//! Pure domain logic for the card payment form.
//!
//! Nothing in this crate performs I/O or awaits. The reactive engine in
//! `cardform-engine` wires these functions into per-field pipelines:
//!
//! - [`normalize`] — strip formatting characters from raw field text.
//! - [`validation`] — map a normalized value to its first failing rule.
//! - [`visibility`] — the per-field reducer that gates error display on blur.
//! - [`types`] — field kinds, normalized values and the form snapshot.

pub mod error;
pub mod normalize;
pub mod types;
pub mod validation;
pub mod visibility;

pub use error::CoreError;
pub use types::{ExpiryParts, FieldKind, FormSnapshot, NormalizedValue};
pub use validation::FieldError;
pub use visibility::{FieldEvent, FieldState};
