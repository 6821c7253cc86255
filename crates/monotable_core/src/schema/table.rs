//! Table schema: the validated, immutable index configuration.

use std::collections::BTreeSet;

use crate::error::{CoreError, CoreResult};
use crate::schema::index::{IndexDefinition, IndexKind};

/// Default physical attribute holding the type discriminator.
pub const DEFAULT_TYPE_ATTRIBUTE: &str = "_type";

/// Default separator between composite key tokens.
pub const DEFAULT_SEPARATOR: &str = "#";

/// The validated, immutable mapping of one record type onto the
/// physical table: primary index, secondary indexes, discriminator, and
/// token separator.
///
/// Built once via [`TableSchema::builder`]; construction fails fast when
/// two indexes share a physical attribute pair or a tag.
#[derive(Debug, Clone)]
pub struct TableSchema {
    table_name: String,
    type_name: String,
    type_attribute: String,
    separator: String,
    primary: IndexDefinition,
    secondaries: Vec<IndexDefinition>,
}

impl TableSchema {
    /// Start building a schema for `type_name` records stored in
    /// `table_name`.
    pub fn builder(
        table_name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> TableSchemaBuilder {
        TableSchemaBuilder {
            table_name: table_name.into(),
            type_name: type_name.into(),
            type_attribute: DEFAULT_TYPE_ATTRIBUTE.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            primary: None,
            secondaries: Vec::new(),
        }
    }

    /// Physical table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Type discriminator value.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Physical attribute the discriminator is written to.
    pub fn type_attribute(&self) -> &str {
        &self.type_attribute
    }

    /// Composite key token separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// The primary index.
    pub fn primary(&self) -> &IndexDefinition {
        &self.primary
    }

    /// Secondary indexes in declaration order.
    pub fn secondaries(&self) -> &[IndexDefinition] {
        &self.secondaries
    }

    /// All indexes in planning order: primary first, then secondaries in
    /// declaration order.
    pub fn indexes(&self) -> impl Iterator<Item = &IndexDefinition> {
        std::iter::once(&self.primary).chain(self.secondaries.iter())
    }

    /// Look up an index by tag.
    pub fn index(&self, tag: &str) -> Option<&IndexDefinition> {
        self.indexes().find(|index| index.tag() == tag)
    }

    /// Every tag the schema defines, in planning order.
    pub fn valid_tags(&self) -> Vec<String> {
        self.indexes().map(|index| index.tag().to_string()).collect()
    }
}

/// Builder for [`TableSchema`].
#[derive(Debug)]
pub struct TableSchemaBuilder {
    table_name: String,
    type_name: String,
    type_attribute: String,
    separator: String,
    primary: Option<IndexDefinition>,
    secondaries: Vec<IndexDefinition>,
}

impl TableSchemaBuilder {
    /// Override the discriminator attribute name.
    #[must_use]
    pub fn type_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.type_attribute = attribute.into();
        self
    }

    /// Override the composite key token separator.
    #[must_use]
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set the primary index.
    #[must_use]
    pub fn primary(mut self, index: IndexDefinition) -> Self {
        self.primary = Some(index);
        self
    }

    /// Add a secondary index. Declaration order is planning order.
    #[must_use]
    pub fn secondary(mut self, index: IndexDefinition) -> Self {
        self.secondaries.push(index);
        self
    }

    /// Validate and freeze the schema.
    pub fn build(self) -> CoreResult<TableSchema> {
        let mut primary = self
            .primary
            .ok_or_else(|| CoreError::config("a primary index is required"))?;
        if primary.kind() != IndexKind::Primary {
            return Err(CoreError::config(format!(
                "index `{}` used as primary must have kind Primary",
                primary.tag()
            )));
        }
        primary.normalize()?;

        let mut secondaries = self.secondaries;
        let mut tags = BTreeSet::new();
        let mut attribute_pairs = BTreeSet::new();
        tags.insert(primary.tag().to_string());
        attribute_pairs.insert(attribute_pair(&primary));

        for index in &mut secondaries {
            if index.kind() == IndexKind::Primary {
                return Err(CoreError::config(format!(
                    "secondary index `{}` cannot have kind Primary",
                    index.tag()
                )));
            }
            index.normalize()?;
            if !tags.insert(index.tag().to_string()) {
                return Err(CoreError::config(format!(
                    "duplicate index tag `{}`",
                    index.tag()
                )));
            }
            if !attribute_pairs.insert(attribute_pair(index)) {
                return Err(CoreError::config(format!(
                    "index `{}` reuses the physical attribute pair ({}, {:?})",
                    index.tag(),
                    index.partition_attribute(),
                    index.sort_attribute()
                )));
            }
        }

        Ok(TableSchema {
            table_name: self.table_name,
            type_name: self.type_name,
            type_attribute: self.type_attribute,
            separator: self.separator,
            primary,
            secondaries,
        })
    }
}

fn attribute_pair(index: &IndexDefinition) -> (String, Option<String>) {
    (
        index.partition_attribute().to_string(),
        index.sort_attribute().map(str::to_string),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::KeyField;

    fn primary_index() -> IndexDefinition {
        IndexDefinition::new("primary", IndexKind::Primary, "pk")
            .sort_attribute("sk")
            .field(KeyField::source("id"))
    }

    #[test]
    fn build_minimal_schema() {
        let schema = TableSchema::builder("app-table", "User")
            .primary(primary_index())
            .build()
            .unwrap();

        assert_eq!(schema.table_name(), "app-table");
        assert_eq!(schema.type_name(), "User");
        assert_eq!(schema.separator(), "#");
        assert_eq!(schema.valid_tags(), vec!["primary"]);
    }

    #[test]
    fn primary_is_required() {
        let err = TableSchema::builder("t", "User").build().unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn duplicate_attribute_pair_fails_fast() {
        let err = TableSchema::builder("t", "User")
            .primary(primary_index())
            .secondary(
                IndexDefinition::new("shadow", IndexKind::Global, "pk")
                    .sort_attribute("sk")
                    .field(KeyField::source("email")),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn duplicate_tag_fails_fast() {
        let err = TableSchema::builder("t", "User")
            .primary(primary_index())
            .secondary(
                IndexDefinition::new("primary", IndexKind::Global, "gsi1_pk")
                    .field(KeyField::source("email")),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn secondary_cannot_be_primary_kind() {
        let err = TableSchema::builder("t", "User")
            .primary(primary_index())
            .secondary(
                IndexDefinition::new("other", IndexKind::Primary, "gsi1_pk")
                    .field(KeyField::source("email")),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn planning_order_is_primary_first() {
        let schema = TableSchema::builder("t", "User")
            .primary(primary_index())
            .secondary(
                IndexDefinition::new("by-email", IndexKind::Global, "gsi1_pk")
                    .field(KeyField::source("email")),
            )
            .build()
            .unwrap();

        let tags: Vec<&str> = schema.indexes().map(IndexDefinition::tag).collect();
        assert_eq!(tags, vec!["primary", "by-email"]);
    }
}
