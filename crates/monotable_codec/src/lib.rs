//! # Monotable Codec
//!
//! Attribute-value model and record codec for Monotable.
//!
//! This crate provides the shared data model of the access layer:
//! - [`Value`] / [`Item`]: the physical document representation
//! - [`RecordCodec`]: the typed-record parse/validate seam
//! - [`FieldViolation`] / [`CodecError`]: structured validation failures
//!
//! ## Usage
//!
//! ```
//! use monotable_codec::{Item, Value};
//!
//! let mut item = Item::new();
//! item.insert("country".to_string(), Value::from("USA"));
//! assert_eq!(item.get("country").and_then(Value::as_text), Some("USA"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod record;
mod value;

pub use error::{CodecError, CodecResult, FieldViolation};
pub use record::{from_item_via_serde, to_item_via_serde, RecordCodec};
pub use value::{present, Item, Value};
