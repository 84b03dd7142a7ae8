//! Core error types for the quill query builder.
//!
//! This module provides the error enum [`QuillError`] shared by every crate in
//! the workspace. Construction errors, missing records, driver failures,
//! dialect capability gaps and configuration problems each get their own
//! variant so callers can match on the condition they care about.

use std::fmt;

use thiserror::Error;

/// The primary error type for quill.
///
/// # Examples
///
/// ```
/// use quill_core::error::QuillError;
///
/// let err = QuillError::record_not_found("User", Some("42"));
/// assert_eq!(err.to_string(), "could not find User with ID=42");
/// assert!(err.is_not_found());
/// ```
#[derive(Error, Debug)]
pub enum QuillError {
    // ── Construction ─────────────────────────────────────────────────

    /// A builder was asked to produce an invalid statement (no values for an
    /// UPDATE, a WHERE clause on an INSERT, an undefined table name, or a
    /// placeholder count that does not match the supplied arguments).
    #[error("{0}")]
    InvalidArgument(String),

    // ── Lookup ───────────────────────────────────────────────────────

    /// A lookup that requires a row found none.
    #[error("{}", not_found_message(.model, .id))]
    RecordNotFound {
        /// The simple type name of the entity that was requested.
        model: String,
        /// The requested identifier, rendered as text, if there was one.
        id: Option<String>,
    },

    // ── Execution ────────────────────────────────────────────────────

    /// A statement failed while being prepared or executed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// The connection itself failed (could not open, lock poisoned, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    /// A column value could not be converted to the requested type.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    // ── Dialect ──────────────────────────────────────────────────────

    /// The active dialect does not support the requested capability.
    #[error("{0}")]
    UnsupportedOperation(String),

    /// The database product name did not map to a known dialect.
    #[error("unknown database product name: {0}")]
    UnknownDatabase(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A builder that has no connection was asked to execute.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[allow(clippy::ref_option)]
fn not_found_message(model: &str, id: &Option<String>) -> String {
    match id {
        Some(id) => format!("could not find {model} with ID={id}"),
        None => format!("could not find {model}"),
    }
}

impl QuillError {
    /// Shorthand for [`QuillError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for [`QuillError::RecordNotFound`].
    pub fn record_not_found(model: impl Into<String>, id: Option<impl fmt::Display>) -> Self {
        Self::RecordNotFound {
            model: model.into(),
            id: id.map(|id| id.to_string()),
        }
    }

    /// Returns `true` for the lookup-not-found condition.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }

    /// Returns `true` for errors raised by the driver rather than by quill.
    pub const fn is_execution_error(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::OperationalError(_))
    }
}

/// A convenience type alias for `Result<T, QuillError>`.
pub type QuillResult<T> = Result<T, QuillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_found_display() {
        let err = QuillError::record_not_found("Topic", Some(7));
        assert_eq!(err.to_string(), "could not find Topic with ID=7");

        let err = QuillError::record_not_found("Topic", None::<i64>);
        assert_eq!(err.to_string(), "could not find Topic");
    }

    #[test]
    fn test_record_not_found_fields() {
        match QuillError::record_not_found("User", Some("abc")) {
            QuillError::RecordNotFound { model, id } => {
                assert_eq!(model, "User");
                assert_eq!(id.as_deref(), Some("abc"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_argument_display_is_bare_message() {
        let err = QuillError::invalid("no UPDATE values supplied");
        assert_eq!(err.to_string(), "no UPDATE values supplied");
    }

    #[test]
    fn test_unknown_database_display() {
        let err = QuillError::UnknownDatabase("Informix".into());
        assert_eq!(err.to_string(), "unknown database product name: Informix");
    }

    #[test]
    fn test_classification() {
        assert!(QuillError::record_not_found("User", Some(1)).is_not_found());
        assert!(!QuillError::DatabaseError("x".into()).is_not_found());
        assert!(QuillError::DatabaseError("x".into()).is_execution_error());
        assert!(QuillError::OperationalError("x".into()).is_execution_error());
        assert!(!QuillError::invalid("x").is_execution_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: QuillError = io_err.into();
        assert!(err.to_string().contains("file missing"));
    }
}
