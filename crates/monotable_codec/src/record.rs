//! Record codec trait and serde-backed helpers.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CodecResult};
use crate::value::{Item, Value};

/// Conversion between a typed application record and its item form.
///
/// This is the schema-validation seam of the access layer: `from_item`
/// is the full parse (typed result or structured violations), and
/// `validate_partial` is the partial-parse variant used for patches,
/// where only the fields actually present must validate.
///
/// Implementations typically lean on serde via [`to_item_via_serde`] and
/// [`from_item_via_serde`] and add their own invariant checks on top.
pub trait RecordCodec: Sized + Send + Sync {
    /// Logical type name, used as the document type discriminator default
    /// and in error messages.
    const TYPE_NAME: &'static str;

    /// Convert this record into an item, validating it as input.
    fn to_item(&self) -> CodecResult<Item>;

    /// Parse an item into a typed record, or report field violations.
    fn from_item(item: &Item) -> CodecResult<Self>;

    /// Validate a partial record: every field that is present must
    /// individually pass validation, absent fields are fine.
    ///
    /// The default accepts everything; override to enforce per-field
    /// invariants on patches.
    fn validate_partial(item: &Item) -> CodecResult<()> {
        let _ = item;
        Ok(())
    }
}

/// Serialize a record into an item through its serde representation.
///
/// The record must serialize to a JSON object; anything else is an
/// unsupported value.
pub fn to_item_via_serde<T: Serialize>(record: &T) -> CodecResult<Item> {
    let json = serde_json::to_value(record)?;
    match Value::from_json(&json) {
        Value::Map(map) => Ok(map),
        other => Err(CodecError::unsupported_value(format!(
            "record serialized to a non-object value ({other:?})"
        ))),
    }
}

/// Deserialize a record from an item through its serde representation.
///
/// Extra attributes (type discriminator, index key attributes) are
/// ignored by serde's default unknown-field handling, so a decorated
/// document parses back to the same record it was built from.
pub fn from_item_via_serde<T: DeserializeOwned>(type_name: &str, item: &Item) -> CodecResult<T> {
    let json = Value::Map(item.clone()).to_json();
    serde_json::from_value(json)
        .map_err(|err| CodecError::violation(type_name, "$", err.to_string()))
}
