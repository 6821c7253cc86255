//! Index definitions.

use std::sync::Arc;

use monotable_codec::Item;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::schema::field::KeyField;

/// Predicate gating whether an index's attributes are written for a
/// record. When it returns false the record never appears in the index.
pub type WritePredicate = Arc<dyn Fn(&Item) -> bool + Send + Sync>;

/// What kind of index this is. Decided once at config build time and
/// never re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// The table's primary index.
    Primary,
    /// A local secondary index (shares the primary partition).
    Local,
    /// A global secondary index (independent partition).
    Global,
}

/// One index over the table: its physical attribute pair and the ordered
/// field list its composite keys are built from.
///
/// The first `partition_field_count` fields form the partition key (all
/// mandatory on writes); the rest form the sort key, built from the
/// longest present prefix of the remaining fields.
#[derive(Clone)]
pub struct IndexDefinition {
    tag: String,
    kind: IndexKind,
    partition_attribute: String,
    sort_attribute: Option<String>,
    fields: Vec<KeyField>,
    partition_field_count: usize,
    write_predicate: Option<WritePredicate>,
}

impl IndexDefinition {
    /// Create an index definition with a single-field partition key and
    /// no sort attribute.
    pub fn new(
        tag: impl Into<String>,
        kind: IndexKind,
        partition_attribute: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            kind,
            partition_attribute: partition_attribute.into(),
            sort_attribute: None,
            fields: Vec::new(),
            partition_field_count: 1,
            write_predicate: None,
        }
    }

    /// Set the physical sort attribute.
    #[must_use]
    pub fn sort_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.sort_attribute = Some(attribute.into());
        self
    }

    /// Append a key field.
    #[must_use]
    pub fn field(mut self, field: KeyField) -> Self {
        self.fields.push(field);
        self
    }

    /// Set how many leading fields form the partition key.
    #[must_use]
    pub fn partition_field_count(mut self, count: usize) -> Self {
        self.partition_field_count = count;
        self
    }

    /// Set the sparse-index write predicate.
    #[must_use]
    pub fn write_predicate(
        mut self,
        predicate: impl Fn(&Item) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.write_predicate = Some(Arc::new(predicate));
        self
    }

    /// The index tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The index kind.
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Whether this is the primary index.
    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::Primary
    }

    /// Physical partition attribute name.
    pub fn partition_attribute(&self) -> &str {
        &self.partition_attribute
    }

    /// Physical sort attribute name, if any.
    pub fn sort_attribute(&self) -> Option<&str> {
        self.sort_attribute.as_deref()
    }

    /// The full ordered field list.
    pub fn key_fields(&self) -> &[KeyField] {
        &self.fields
    }

    /// The fields forming the partition key.
    pub fn partition_fields(&self) -> &[KeyField] {
        &self.fields[..self.partition_field_count.min(self.fields.len())]
    }

    /// The fields forming the sort key, in order.
    pub fn sort_fields(&self) -> &[KeyField] {
        &self.fields[self.partition_field_count.min(self.fields.len())..]
    }

    /// The sparse-index write predicate, if any.
    pub fn predicate(&self) -> Option<&WritePredicate> {
        self.write_predicate.as_ref()
    }

    /// Validate and normalize this definition at schema build time.
    ///
    /// `partition_field_count` saturates at the field-list length: the
    /// whole list then forms the partition key and the sort key carries
    /// only the type discriminator.
    pub(crate) fn normalize(&mut self) -> CoreResult<()> {
        if self.fields.is_empty() {
            return Err(CoreError::config(format!(
                "index `{}` has no key fields",
                self.tag
            )));
        }
        if self.partition_field_count == 0 {
            return Err(CoreError::config(format!(
                "index `{}` must have at least one partition field",
                self.tag
            )));
        }
        if self.partition_field_count > self.fields.len() {
            debug!(
                tag = %self.tag,
                requested = self.partition_field_count,
                available = self.fields.len(),
                "partition field count exceeds field list; saturating"
            );
            self.partition_field_count = self.fields.len();
        }
        Ok(())
    }
}

impl std::fmt::Debug for IndexDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexDefinition")
            .field("tag", &self.tag)
            .field("kind", &self.kind)
            .field("partition_attribute", &self.partition_attribute)
            .field("sort_attribute", &self.sort_attribute)
            .field("fields", &self.fields)
            .field("partition_field_count", &self.partition_field_count)
            .field("sparse", &self.write_predicate.is_some())
            .finish()
    }
}
