//! Error types for the access layer.

use monotable_codec::{CodecError, FieldViolation, Item};
use monotable_store::StoreError;
use thiserror::Error;

/// Result type for access-layer operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in access-layer operations.
///
/// Configuration errors abort schema construction; per-operation errors
/// carry the originating method name and entity type name, and
/// validation errors additionally carry the structured field-level
/// violation list.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The table schema is invalid. Raised at build time, never later.
    #[error("invalid table configuration: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// An explicitly requested index tag does not exist.
    #[error("unknown index `{tag}`, valid tags are {valid_tags:?}")]
    IndexNotFound {
        /// The requested tag.
        tag: String,
        /// Every tag the schema defines.
        valid_tags: Vec<String>,
    },

    /// No index covers the query's predicate fields.
    #[error("no index of {type_name} covers query fields {fields:?}")]
    NoIndexForQuery {
        /// Entity type being queried.
        type_name: String,
        /// The predicate's field names.
        fields: Vec<String>,
    },

    /// A required key field was absent while encoding an index key.
    #[error(
        "index `{index_tag}` requires field `{field}` which is missing (received: {received:?})"
    )]
    MissingKeyField {
        /// The index being encoded.
        index_tag: String,
        /// The missing field.
        field: String,
        /// Fields that were present in the input.
        received: Vec<String>,
    },

    /// Stored data failed read-time schema validation.
    #[error("{method}: stored {type_name} item failed validation")]
    OutputValidation {
        /// Originating repository method.
        method: &'static str,
        /// Entity type being read.
        type_name: String,
        /// Field-level violations.
        violations: Vec<FieldViolation>,
    },

    /// A write payload failed schema validation.
    #[error("{method}: {type_name} input failed validation")]
    InputValidation {
        /// Originating repository method.
        method: &'static str,
        /// Entity type being written.
        type_name: String,
        /// Field-level violations.
        violations: Vec<FieldViolation>,
    },

    /// A create/update precondition did not hold.
    #[error("{method}: conditional write failed for {type_name}")]
    ConditionalWrite {
        /// Originating repository method.
        method: &'static str,
        /// Entity type being written.
        type_name: String,
    },

    /// Merge addressed a missing item and no default was supplied.
    #[error("{method}: cannot merge into missing {type_name} item without a default")]
    MergeMissingTarget {
        /// Originating repository method.
        method: &'static str,
        /// Entity type being merged.
        type_name: String,
    },

    /// Opaque store failure, propagated unmodified.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an unknown-index error.
    pub fn index_not_found(tag: impl Into<String>, valid_tags: Vec<String>) -> Self {
        Self::IndexNotFound {
            tag: tag.into(),
            valid_tags,
        }
    }

    /// Create a no-covering-index error.
    pub fn no_index_for_query(type_name: impl Into<String>, fields: Vec<String>) -> Self {
        Self::NoIndexForQuery {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Create a missing-key-field error, capturing the fields received.
    pub fn missing_key_field(
        index_tag: impl Into<String>,
        field: impl Into<String>,
        received: &Item,
    ) -> Self {
        Self::MissingKeyField {
            index_tag: index_tag.into(),
            field: field.into(),
            received: received.keys().cloned().collect(),
        }
    }

    /// Wrap a codec failure as an input validation error.
    pub fn input_validation(
        method: &'static str,
        type_name: impl Into<String>,
        cause: CodecError,
    ) -> Self {
        Self::InputValidation {
            method,
            type_name: type_name.into(),
            violations: violations_of(cause),
        }
    }

    /// Wrap a codec failure as an output validation error.
    pub fn output_validation(
        method: &'static str,
        type_name: impl Into<String>,
        cause: CodecError,
    ) -> Self {
        Self::OutputValidation {
            method,
            type_name: type_name.into(),
            violations: violations_of(cause),
        }
    }

    /// Create a conditional write failure.
    pub fn conditional_write(method: &'static str, type_name: impl Into<String>) -> Self {
        Self::ConditionalWrite {
            method,
            type_name: type_name.into(),
        }
    }

    /// Create a merge-into-missing-item failure.
    pub fn merge_missing_target(method: &'static str, type_name: impl Into<String>) -> Self {
        Self::MergeMissingTarget {
            method,
            type_name: type_name.into(),
        }
    }
}

/// Pull the field violations out of a codec error, or synthesize one.
fn violations_of(cause: CodecError) -> Vec<FieldViolation> {
    match cause {
        CodecError::Validation { violations, .. } => violations,
        other => vec![FieldViolation::new("$", other.to_string())],
    }
}
