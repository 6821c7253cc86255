//! Request and response types for the store client.

use std::collections::BTreeMap;

use monotable_codec::{Item, Value};

/// Maximum number of keys a single batch get call may carry.
pub const MAX_BATCH_GET_ITEMS: usize = 100;

/// Maximum number of writes a single batch write call may carry.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// A compiled expression with interned attribute placeholders.
///
/// Attribute names appear as `#n…` and values as `:v…`; the maps resolve
/// each placeholder. Expressions are immutable values: they can be
/// inspected, compared, and logged without touching the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// The expression text, e.g. `#n0 = :v0 AND begins_with(#n1, :v1)`.
    pub expression: String,
    /// Placeholder to physical attribute name.
    pub names: BTreeMap<String, String>,
    /// Placeholder to value.
    pub values: BTreeMap<String, Value>,
}

impl Expression {
    /// Create an expression from its parts.
    pub fn new(
        expression: impl Into<String>,
        names: BTreeMap<String, String>,
        values: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            expression: expression.into(),
            names,
            values,
        }
    }
}

/// Single-item read request.
#[derive(Debug, Clone)]
pub struct GetRequest {
    /// Table to read from.
    pub table: String,
    /// Full primary key attributes of the item.
    pub key: Item,
}

/// Single-item write request.
#[derive(Debug, Clone)]
pub struct PutRequest {
    /// Table to write to.
    pub table: String,
    /// The full document to store.
    pub item: Item,
    /// Optional condition that must hold against the current item.
    pub condition: Option<Expression>,
}

/// Single-item delete request.
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    /// Table to delete from.
    pub table: String,
    /// Full primary key attributes of the item.
    pub key: Item,
    /// Optional condition that must hold against the current item.
    pub condition: Option<Expression>,
}

/// Index query request.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Table to query.
    pub table: String,
    /// Secondary index to query, or `None` for the primary index.
    pub index: Option<String>,
    /// Key condition: partition equality plus an optional sort condition.
    pub key_condition: Expression,
    /// Ascending sort order when true.
    pub forward: bool,
    /// Maximum number of items to return in this page.
    pub limit: Option<u32>,
    /// Continuation key from a previous page's [`QueryResponse::last_key`].
    pub start_key: Option<Item>,
}

/// Result of a query page.
#[derive(Debug, Clone, Default)]
pub struct QueryResponse {
    /// Items in stored sort order.
    pub items: Vec<Item>,
    /// Number of items returned.
    pub count: usize,
    /// Continuation key when more items remain; feed back as
    /// [`QueryRequest::start_key`]. Contains the queried index's key
    /// attributes and the primary key attributes of the last item.
    pub last_key: Option<Item>,
}

/// One key in a batch get call.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchGetRequest {
    /// Table to read from.
    pub table: String,
    /// Full primary key attributes of the item.
    pub key: Item,
}

/// Result of a batch get call.
#[derive(Debug, Clone, Default)]
pub struct BatchGetResponse {
    /// Found items, each paired with the request it answers.
    pub found: Vec<(BatchGetRequest, Item)>,
    /// Keys the store did not process this round; resubmit them.
    pub unprocessed: Vec<BatchGetRequest>,
}

/// One write in a batch write call.
///
/// Batch writes carry no conditions; they are full-key puts and deletes
/// and therefore idempotent under retry.
#[derive(Debug, Clone)]
pub enum WriteRequest {
    /// Store (or replace) an item.
    Put {
        /// Table to write to.
        table: String,
        /// The full document to store.
        item: Item,
    },
    /// Remove an item.
    Delete {
        /// Table to delete from.
        table: String,
        /// Full primary key attributes of the item.
        key: Item,
    },
}

/// Result of a batch write call.
#[derive(Debug, Clone, Default)]
pub struct BatchWriteResponse {
    /// Writes the store did not process this round; resubmit them.
    pub unprocessed: Vec<WriteRequest>,
}

/// Canonical string form of a (table, key) address.
///
/// Keys are `BTreeMap`s, so serialization order is already sorted; two
/// requests for the same item always canonicalize identically. Used for
/// batch deduplication and cache keys.
pub fn canonical_key(table: &str, key: &Item) -> String {
    let encoded = serde_json::to_string(&Value::Map(key.clone())).unwrap_or_default();
    format!("{table}/{encoded}")
}
