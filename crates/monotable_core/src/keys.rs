//! Composite key encoding and sparse-index decoration.
//!
//! A composite key is the type discriminator followed by ordered
//! `fieldName-fieldValue` tokens, joined with the schema separator. The
//! partition key takes the index's leading fields (all mandatory); the
//! sort key takes the longest present prefix of the remaining fields,
//! which is what makes prefix ("begins with") queries on partial records
//! work.

use monotable_codec::{Item, Value};

use crate::error::{CoreError, CoreResult};
use crate::schema::{IndexDefinition, TableSchema};

/// Encode the partition key value of `index` for a (partial) record.
///
/// Every partition field must be present; a missing one is a
/// [`CoreError::MissingKeyField`] naming the index, the field, and the
/// fields received.
pub fn partition_key_value(
    schema: &TableSchema,
    index: &IndexDefinition,
    record: &Item,
) -> CoreResult<String> {
    let mut value = schema.type_name().to_string();
    for field in index.partition_fields() {
        let token = field
            .token(record)
            .ok_or_else(|| CoreError::missing_key_field(index.tag(), field.name(), record))?;
        value.push_str(schema.separator());
        value.push_str(&token);
    }
    Ok(value)
}

/// Encode the sort key value of `index` for a (partial) record: the
/// discriminator plus tokens for the longest present prefix of the sort
/// fields. With no sort field present this is the discriminator alone.
pub fn sort_key_value(schema: &TableSchema, index: &IndexDefinition, record: &Item) -> String {
    let mut value = schema.type_name().to_string();
    for field in index.sort_fields() {
        match field.token(record) {
            Some(token) => {
                value.push_str(schema.separator());
                value.push_str(&token);
            }
            None => break,
        }
    }
    value
}

/// Compute the physical key attributes of `index` for a (partial) record.
pub fn index_key_attributes(
    schema: &TableSchema,
    index: &IndexDefinition,
    record: &Item,
) -> CoreResult<Item> {
    let mut attributes = Item::new();
    attributes.insert(
        index.partition_attribute().to_string(),
        Value::Text(partition_key_value(schema, index, record)?),
    );
    if let Some(sort_attribute) = index.sort_attribute() {
        attributes.insert(
            sort_attribute.to_string(),
            Value::Text(sort_key_value(schema, index, record)),
        );
    }
    Ok(attributes)
}

/// Compute the primary key attributes for a (partial) record.
pub fn primary_key_attributes(schema: &TableSchema, record: &Item) -> CoreResult<Item> {
    index_key_attributes(schema, schema.primary(), record)
}

/// Extract the primary key attributes already present on a stored
/// document, without re-encoding.
pub fn extract_primary_key(schema: &TableSchema, document: &Item) -> Option<Item> {
    let primary = schema.primary();
    let mut key = Item::new();
    key.insert(
        primary.partition_attribute().to_string(),
        document.get(primary.partition_attribute())?.clone(),
    );
    if let Some(sort_attribute) = primary.sort_attribute() {
        key.insert(
            sort_attribute.to_string(),
            document.get(sort_attribute)?.clone(),
        );
    }
    Some(key)
}

/// Decorate a record with the discriminator and the key attributes of
/// every eligible index.
///
/// An index is eligible when its write predicate (if any) holds and all
/// of its partition fields are present. Ineligible secondary indexes
/// contribute nothing; their attributes are omitted entirely, never
/// written as null. That omission is what keeps non-qualifying items out
/// of sparse indexes on a store with no native sparse-index support.
///
/// The primary index is never optional: missing primary key fields fail.
/// Any decoration attributes already on the input are recomputed, so a
/// record that stopped qualifying for an index loses its attributes.
pub fn decorate(schema: &TableSchema, record: &Item) -> CoreResult<Item> {
    let mut document = record.clone();
    document.remove(schema.type_attribute());
    for index in schema.indexes() {
        document.remove(index.partition_attribute());
        if let Some(sort_attribute) = index.sort_attribute() {
            document.remove(sort_attribute);
        }
    }

    document.insert(
        schema.type_attribute().to_string(),
        Value::Text(schema.type_name().to_string()),
    );
    document.extend(index_key_attributes(schema, schema.primary(), record)?);

    for index in schema.secondaries() {
        if let Some(predicate) = index.predicate() {
            if !predicate(record) {
                continue;
            }
        }
        match index_key_attributes(schema, index, record) {
            Ok(attributes) => document.extend(attributes),
            Err(CoreError::MissingKeyField { .. }) => continue,
            Err(other) => return Err(other),
        }
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{IndexKind, KeyField};

    fn schema() -> TableSchema {
        TableSchema::builder("app-table", "User")
            .primary(
                IndexDefinition::new("primary", IndexKind::Primary, "pk")
                    .sort_attribute("sk")
                    .field(KeyField::source("country"))
                    .field(KeyField::source("state"))
                    .field(KeyField::padded("created_at", 12)),
            )
            .secondary(
                IndexDefinition::new("by-email", IndexKind::Global, "gsi1_pk")
                    .field(KeyField::source("email")),
            )
            .secondary(
                IndexDefinition::new("by-premium", IndexKind::Global, "gsi2_pk")
                    .sort_attribute("gsi2_sk")
                    .field(KeyField::source("country"))
                    .field(KeyField::padded("created_at", 12))
                    .write_predicate(|record| {
                        record.get("premium").and_then(Value::as_bool).unwrap_or(false)
                    }),
            )
            .build()
            .unwrap()
    }

    fn user(premium: bool) -> Item {
        let mut item = Item::new();
        item.insert("country".to_string(), Value::from("USA"));
        item.insert("state".to_string(), Value::from("UT"));
        item.insert("created_at".to_string(), Value::Integer(42));
        item.insert("email".to_string(), Value::from("ada@example.com"));
        item.insert("premium".to_string(), Value::Bool(premium));
        item
    }

    #[test]
    fn partition_key_is_discriminator_plus_tokens() {
        let schema = schema();
        let value = partition_key_value(&schema, schema.primary(), &user(false)).unwrap();
        assert_eq!(value, "User#country-USA");
    }

    #[test]
    fn sort_key_takes_longest_present_prefix() {
        let schema = schema();
        let full = sort_key_value(&schema, schema.primary(), &user(false));
        assert_eq!(full, "User#state-UT#created_at-000000000042");

        let mut partial = user(false);
        partial.remove("state");
        // created_at is present but the prefix stops at the missing state.
        assert_eq!(sort_key_value(&schema, schema.primary(), &partial), "User");
    }

    #[test]
    fn missing_partition_field_is_an_error() {
        let schema = schema();
        let mut record = user(false);
        record.remove("country");

        let err = partition_key_value(&schema, schema.primary(), &record).unwrap_err();
        match err {
            CoreError::MissingKeyField {
                index_tag, field, ..
            } => {
                assert_eq!(index_tag, "primary");
                assert_eq!(field, "country");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decorate_writes_eligible_indexes_only() {
        let schema = schema();
        let document = decorate(&schema, &user(false)).unwrap();

        assert_eq!(document.get("_type"), Some(&Value::from("User")));
        assert!(document.contains_key("pk"));
        assert!(document.contains_key("sk"));
        assert!(document.contains_key("gsi1_pk"));
        // Predicate is false: the sparse index attributes are omitted.
        assert!(!document.contains_key("gsi2_pk"));
        assert!(!document.contains_key("gsi2_sk"));
    }

    #[test]
    fn decorate_honors_write_predicate() {
        let schema = schema();
        let document = decorate(&schema, &user(true)).unwrap();
        assert_eq!(
            document.get("gsi2_pk"),
            Some(&Value::from("User#country-USA"))
        );
    }

    #[test]
    fn decorate_omits_index_with_missing_fields() {
        let schema = schema();
        let mut record = user(false);
        record.remove("email");

        let document = decorate(&schema, &record).unwrap();
        assert!(!document.contains_key("gsi1_pk"));
    }

    #[test]
    fn redecorating_removes_stale_attributes() {
        let schema = schema();
        let document = decorate(&schema, &user(true)).unwrap();
        assert!(document.contains_key("gsi2_pk"));

        let mut downgraded = document.clone();
        downgraded.insert("premium".to_string(), Value::Bool(false));
        let redecorated = decorate(&schema, &downgraded).unwrap();
        assert!(!redecorated.contains_key("gsi2_pk"));
    }

    #[test]
    fn decoration_roundtrips_through_key_encoding() {
        let schema = schema();
        let record = user(true);
        let document = decorate(&schema, &record).unwrap();

        for index in schema.indexes() {
            let attributes = index_key_attributes(&schema, index, &record).unwrap();
            for (attribute, value) in &attributes {
                assert_eq!(document.get(attribute), Some(value), "index {}", index.tag());
            }
        }
    }

    #[test]
    fn extract_primary_key_reads_stored_attributes() {
        let schema = schema();
        let document = decorate(&schema, &user(false)).unwrap();
        let key = extract_primary_key(&schema, &document).unwrap();

        assert_eq!(key.len(), 2);
        assert_eq!(key.get("pk"), document.get("pk"));
        assert_eq!(key.get("sk"), document.get("sk"));
    }
}
