use thiserror::Error;

/// Result type for strict validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Why a value does not satisfy a schema.
///
/// Field names are dotted paths from the schema root (e.g. `profile.name`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("expected an object, got {found}")]
    NotAnObject { found: String },

    #[error("missing field '{field}'")]
    MissingField { field: String },

    #[error("field '{field}' should be {expected}, got {found}")]
    KindMismatch {
        field: String,
        expected: String,
        found: String,
    },
}
