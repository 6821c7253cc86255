//! Test fixtures: a representative record type, its table schema, and
//! store helpers.
//!
//! The [`Customer`] schema exercises every index shape the access layer
//! supports: a multi-field primary sort key with a zero-padded numeric
//! field, an index sparse by field absence, an index with a derived
//! field, and an index gated by a write predicate.

use std::sync::Arc;

use monotable_codec::{
    from_item_via_serde, present, to_item_via_serde, CodecError, CodecResult, FieldViolation,
    Item, RecordCodec, Value,
};
use monotable_core::{IndexDefinition, IndexKind, KeyField, Repository, TableSchema};
use monotable_store::{MemoryStore, TableDef};
use serde::{Deserialize, Serialize};

/// A customer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique customer id.
    pub id: String,
    /// Country of residence.
    pub country: String,
    /// State or province.
    pub state: String,
    /// Creation timestamp, seconds.
    pub created_at: i64,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email; customers without one never appear in the email
    /// index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Premium flag gating the premium index.
    pub premium: bool,
}

impl Customer {
    fn check(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.id.is_empty() {
            violations.push(FieldViolation::new("id", "must not be empty"));
        }
        if self.created_at < 0 {
            violations.push(FieldViolation::new("created_at", "must not be negative"));
        }
        violations
    }
}

impl RecordCodec for Customer {
    const TYPE_NAME: &'static str = "Customer";

    fn to_item(&self) -> CodecResult<Item> {
        let violations = self.check();
        if !violations.is_empty() {
            return Err(CodecError::validation(Self::TYPE_NAME, violations));
        }
        to_item_via_serde(self)
    }

    fn from_item(item: &Item) -> CodecResult<Self> {
        let customer: Self = from_item_via_serde(Self::TYPE_NAME, item)?;
        let violations = customer.check();
        if !violations.is_empty() {
            return Err(CodecError::validation(Self::TYPE_NAME, violations));
        }
        Ok(customer)
    }

    fn validate_partial(item: &Item) -> CodecResult<()> {
        let mut violations = Vec::new();
        if let Some(id) = present(item, "id") {
            if id.as_text().is_none_or(str::is_empty) {
                violations.push(FieldViolation::new("id", "must not be empty"));
            }
        }
        if let Some(created_at) = present(item, "created_at") {
            if created_at.as_integer().is_none_or(|n| n < 0) {
                violations.push(FieldViolation::new(
                    "created_at",
                    "must be a non-negative integer",
                ));
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(CodecError::validation(Self::TYPE_NAME, violations))
        }
    }
}

/// Zero-pad width for `created_at` tokens.
pub const CREATED_AT_PAD: usize = 12;

/// The customers table schema.
pub fn customers_schema() -> TableSchema {
    TableSchema::builder("customers", "Customer")
        .primary(
            IndexDefinition::new("primary", IndexKind::Primary, "pk")
                .sort_attribute("sk")
                .field(KeyField::source("country"))
                .field(KeyField::source("state"))
                .field(KeyField::padded("created_at", CREATED_AT_PAD))
                .field(KeyField::source("id")),
        )
        .secondary(
            IndexDefinition::new("by-email", IndexKind::Global, "gsi1_pk")
                .field(KeyField::source("email")),
        )
        .secondary(
            IndexDefinition::new("by-name", IndexKind::Global, "gsi2_pk")
                .sort_attribute("gsi2_sk")
                .field(KeyField::source("country"))
                .field(KeyField::derived(
                    "full_name",
                    vec!["first_name".to_string(), "last_name".to_string()],
                    |record| {
                        Some(format!(
                            "{}.{}",
                            record.get("first_name")?.as_text()?,
                            record.get("last_name")?.as_text()?
                        ))
                    },
                )),
        )
        .secondary(
            IndexDefinition::new("by-premium", IndexKind::Global, "gsi3_pk")
                .sort_attribute("gsi3_sk")
                .field(KeyField::source("country"))
                .field(KeyField::padded("created_at", CREATED_AT_PAD))
                .field(KeyField::source("id"))
                .write_predicate(|record| {
                    record.get("premium").and_then(Value::as_bool).unwrap_or(false)
                }),
        )
        .build()
        .expect("fixture schema is valid")
}

/// Physical table layout of a schema, for [`MemoryStore`] registration.
pub fn table_def_for(schema: &TableSchema) -> TableDef {
    let mut def = TableDef::new(
        schema.table_name(),
        schema.primary().partition_attribute(),
        schema.primary().sort_attribute(),
    );
    for index in schema.secondaries() {
        def = def.index(
            index.tag(),
            index.partition_attribute(),
            index.sort_attribute(),
        );
    }
    def
}

/// A memory store with the schema's table registered.
pub fn memory_store_for(schema: &TableSchema) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.register_table(table_def_for(schema));
    store
}

/// A customer repository over a fresh memory store.
pub fn customer_repository() -> (Repository<Customer, MemoryStore>, Arc<MemoryStore>) {
    let schema = customers_schema();
    let store = memory_store_for(&schema);
    (Repository::new(schema, Arc::clone(&store)), store)
}

/// A representative customer.
pub fn sample_customer(id: &str) -> Customer {
    Customer {
        id: id.to_string(),
        country: "USA".to_string(),
        state: "UT".to_string(),
        created_at: 100,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: Some(format!("{id}@example.com")),
        premium: false,
    }
}

/// The primary key fields of a customer, as a partial record.
pub fn key_fields(customer: &Customer) -> Item {
    let mut key = Item::new();
    key.insert("country".to_string(), Value::from(customer.country.clone()));
    key.insert("state".to_string(), Value::from(customer.state.clone()));
    key.insert("created_at".to_string(), Value::Integer(customer.created_at));
    key.insert("id".to_string(), Value::from(customer.id.clone()));
    key
}
