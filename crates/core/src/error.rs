/// Errors raised by the pure domain layer.
///
/// Field validation failures are not errors in this sense: they are data,
/// carried by [`FieldError`](crate::validation::FieldError).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Unknown form field: {0}")]
    UnknownField(String),
}
