//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// The offending field, as a path from the record root.
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl FieldViolation {
    /// Create a new field violation.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors that can occur while converting records to and from items.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The record or item failed schema validation.
    #[error("{type_name} failed validation ({} violation(s))", .violations.len())]
    Validation {
        /// Record type that was being validated.
        type_name: String,
        /// Field-level violations, in schema declaration order.
        violations: Vec<FieldViolation>,
    },

    /// JSON conversion failed.
    #[error("JSON conversion failed: {message}")]
    Json {
        /// Description of the conversion failure.
        message: String,
    },

    /// A value cannot be represented as an item attribute.
    #[error("unsupported value: {reason}")]
    UnsupportedValue {
        /// Why the value is unsupported.
        reason: String,
    },
}

impl CodecError {
    /// Create a validation error from a violation list.
    pub fn validation(type_name: impl Into<String>, violations: Vec<FieldViolation>) -> Self {
        Self::Validation {
            type_name: type_name.into(),
            violations,
        }
    }

    /// Create a validation error for a single field.
    pub fn violation(
        type_name: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            type_name: type_name.into(),
            violations: vec![FieldViolation::new(field, message)],
        }
    }

    /// Create an unsupported value error.
    pub fn unsupported_value(reason: impl Into<String>) -> Self {
        Self::UnsupportedValue {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}
