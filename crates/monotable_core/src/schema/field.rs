//! Key field specifications.

use std::sync::Arc;

use monotable_codec::{present, Item, Value};

/// Function that derives one key token from several source fields.
pub type StringifyFn = Arc<dyn Fn(&Item) -> Option<String> + Send + Sync>;

/// One field of an index's ordered field list.
///
/// A field is either a direct projection of one record field, or a
/// derived field whose token is computed from several source fields by a
/// caller-supplied stringifier. A derived field counts as present only
/// when every one of its source fields is present.
#[derive(Clone)]
pub enum KeyField {
    /// Direct projection of a record field.
    Source {
        /// Record field name; also the token label.
        name: String,
        /// Zero-pad integer values to this width so lexicographic
        /// ordering matches numeric ordering.
        pad: Option<usize>,
    },
    /// Token computed from several source fields.
    Derived {
        /// Token label.
        name: String,
        /// Record fields the stringifier reads.
        sources: Vec<String>,
        /// The stringifier.
        stringify: StringifyFn,
    },
}

impl KeyField {
    /// A direct field projection.
    pub fn source(name: impl Into<String>) -> Self {
        Self::Source {
            name: name.into(),
            pad: None,
        }
    }

    /// A direct field projection with zero-padded integer tokens.
    pub fn padded(name: impl Into<String>, width: usize) -> Self {
        Self::Source {
            name: name.into(),
            pad: Some(width),
        }
    }

    /// A derived field spanning several source fields.
    pub fn derived(
        name: impl Into<String>,
        sources: Vec<String>,
        stringify: impl Fn(&Item) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self::Derived {
            name: name.into(),
            sources,
            stringify: Arc::new(stringify),
        }
    }

    /// The field's token label.
    pub fn name(&self) -> &str {
        match self {
            Self::Source { name, .. } | Self::Derived { name, .. } => name,
        }
    }

    /// The record fields this key field reads.
    pub fn source_fields(&self) -> Vec<&str> {
        match self {
            Self::Source { name, .. } => vec![name.as_str()],
            Self::Derived { sources, .. } => sources.iter().map(String::as_str).collect(),
        }
    }

    /// Whether every field this key field reads is present in `item`.
    pub fn is_present(&self, item: &Item) -> bool {
        self.source_fields()
            .iter()
            .all(|field| present(item, field).is_some())
    }

    /// Compute this field's `name-value` token from `item`, or `None`
    /// when a needed field is absent or has no token representation.
    pub fn token(&self, item: &Item) -> Option<String> {
        match self {
            Self::Source { name, pad } => {
                let value = present(item, name)?;
                let text = match value {
                    Value::Text(s) => s.clone(),
                    Value::Integer(n) => match pad {
                        Some(width) => format!("{n:0w$}", w = *width),
                        None => n.to_string(),
                    },
                    Value::Float(f) => f.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                Some(format!("{name}-{text}"))
            }
            Self::Derived {
                name, stringify, ..
            } => {
                if !self.is_present(item) {
                    return None;
                }
                let text = stringify(item)?;
                Some(format!("{name}-{text}"))
            }
        }
    }
}

impl std::fmt::Debug for KeyField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source { name, pad } => f
                .debug_struct("Source")
                .field("name", name)
                .field("pad", pad)
                .finish(),
            Self::Derived { name, sources, .. } => f
                .debug_struct("Derived")
                .field("name", name)
                .field("sources", sources)
                .finish_non_exhaustive(),
        }
    }
}
