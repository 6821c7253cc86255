//! In-memory store for testing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use monotable_codec::{Item, Value};
use parking_lot::{Mutex, RwLock};

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};
use crate::types::{
    canonical_key, BatchGetRequest, BatchGetResponse, BatchWriteResponse, DeleteRequest,
    Expression, GetRequest, PutRequest, QueryRequest, QueryResponse, WriteRequest,
    MAX_BATCH_GET_ITEMS, MAX_BATCH_WRITE_ITEMS,
};

/// Physical key attribute pair of one index.
#[derive(Debug, Clone)]
pub struct KeySchema {
    /// Partition (hash) attribute name.
    pub partition: String,
    /// Sort (range) attribute name, if the index has one.
    pub sort: Option<String>,
}

impl KeySchema {
    /// Create a key schema.
    pub fn new(partition: impl Into<String>, sort: Option<&str>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.map(str::to_string),
        }
    }
}

/// Declarative table layout the in-memory store needs to emulate a
/// hash/range store: the primary key pair and each secondary index's pair.
#[derive(Debug, Clone)]
pub struct TableDef {
    /// Table name.
    pub name: String,
    /// Primary index key attributes.
    pub primary: KeySchema,
    /// Secondary index name to key attributes.
    pub indexes: BTreeMap<String, KeySchema>,
}

impl TableDef {
    /// Create a table definition with no secondary indexes.
    pub fn new(name: impl Into<String>, partition: impl Into<String>, sort: Option<&str>) -> Self {
        Self {
            name: name.into(),
            primary: KeySchema::new(partition, sort),
            indexes: BTreeMap::new(),
        }
    }

    /// Add a secondary index.
    #[must_use]
    pub fn index(
        mut self,
        name: impl Into<String>,
        partition: impl Into<String>,
        sort: Option<&str>,
    ) -> Self {
        self.indexes
            .insert(name.into(), KeySchema::new(partition, sort));
        self
    }
}

struct TableState {
    def: TableDef,
    /// Canonical primary key to item.
    items: BTreeMap<String, Item>,
}

#[derive(Default)]
struct Faults {
    /// Per-batch-call unprocessed counts; each batch call pops one.
    unprocessed: VecDeque<usize>,
    /// Hard errors; the next call pops one and fails with it.
    errors: VecDeque<StoreError>,
}

/// An in-memory store client.
///
/// Emulates a hash/range store faithfully enough for every access-layer
/// semantic: partition equality and sort `begins_with` key conditions,
/// conditional puts and deletes, limit plus continuation-key pagination,
/// and batch calls with their per-call caps and a partial "unprocessed"
/// channel. Suitable for unit tests, integration tests, and ephemeral
/// fixtures.
///
/// # Failure injection
///
/// Tests drive the retry paths with [`MemoryStore::inject_unprocessed`]
/// (the next batch calls leave that many trailing requests unprocessed)
/// and [`MemoryStore::inject_error`] (the next call fails hard).
///
/// # Thread safety
///
/// The store is thread-safe and can be shared across tasks.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, TableState>>,
    faults: Mutex<Faults>,
    fetches: Mutex<BTreeMap<String, usize>>,
}

impl MemoryStore {
    /// Creates a new empty store with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table. Replaces any existing table with the same name,
    /// dropping its items.
    pub fn register_table(&self, def: TableDef) {
        let mut tables = self.tables.write();
        tables.insert(
            def.name.clone(),
            TableState {
                def,
                items: BTreeMap::new(),
            },
        );
    }

    /// Queue unprocessed counts for upcoming batch calls; each batch call
    /// consumes one count and leaves that many trailing requests
    /// unprocessed.
    pub fn inject_unprocessed(&self, counts: impl IntoIterator<Item = usize>) {
        self.faults.lock().unprocessed.extend(counts);
    }

    /// Make the next store call fail with the given error.
    pub fn inject_error(&self, error: StoreError) {
        self.faults.lock().errors.push_back(error);
    }

    /// How many times this key was actually fetched (via `get` or a
    /// processed `batch_get` entry).
    pub fn fetch_count(&self, table: &str, key: &Item) -> usize {
        let tables = self.tables.read();
        let canon = match tables.get(table) {
            Some(state) => match key_of(&state.def, key) {
                Ok(primary) => canonical_key(table, &primary),
                Err(_) => canonical_key(table, key),
            },
            None => canonical_key(table, key),
        };
        self.fetches.lock().get(&canon).copied().unwrap_or(0)
    }

    /// Number of items currently stored in a table.
    pub fn table_len(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map(|state| state.items.len())
            .unwrap_or(0)
    }

    fn take_error(&self) -> StoreResult<()> {
        match self.faults.lock().errors.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record_fetch(&self, canon: String) {
        *self.fetches.lock().entry(canon).or_insert(0) += 1;
    }
}

/// Extract the primary key attributes of `source` under `def`.
fn key_of(def: &TableDef, source: &Item) -> StoreResult<Item> {
    let mut key = Item::new();
    let partition = source.get(&def.primary.partition).ok_or_else(|| {
        StoreError::invalid_request(format!(
            "missing partition attribute `{}`",
            def.primary.partition
        ))
    })?;
    key.insert(def.primary.partition.clone(), partition.clone());

    if let Some(sort_attr) = &def.primary.sort {
        let sort = source.get(sort_attr).ok_or_else(|| {
            StoreError::invalid_request(format!("missing sort attribute `{sort_attr}`"))
        })?;
        key.insert(sort_attr.clone(), sort.clone());
    }
    Ok(key)
}

fn resolve_name<'a>(expr: &'a Expression, placeholder: &str) -> StoreResult<&'a str> {
    expr.names
        .get(placeholder)
        .map(String::as_str)
        .ok_or_else(|| StoreError::invalid_request(format!("unresolved name `{placeholder}`")))
}

fn resolve_value<'a>(expr: &'a Expression, placeholder: &str) -> StoreResult<&'a Value> {
    expr.values
        .get(placeholder)
        .ok_or_else(|| StoreError::invalid_request(format!("unresolved value `{placeholder}`")))
}

/// Evaluate a write condition against the current item.
///
/// The store understands exactly the condition shapes the access layer
/// compiles: `attribute_exists(#n)` and `attribute_not_exists(#n)`.
fn eval_condition(expr: &Expression, existing: Option<&Item>) -> StoreResult<bool> {
    let text = expr.expression.trim();
    if let Some(inner) = text
        .strip_prefix("attribute_not_exists(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let attr = resolve_name(expr, inner.trim())?;
        return Ok(!existing.is_some_and(|item| item.contains_key(attr)));
    }
    if let Some(inner) = text
        .strip_prefix("attribute_exists(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let attr = resolve_name(expr, inner.trim())?;
        return Ok(existing.is_some_and(|item| item.contains_key(attr)));
    }
    Err(StoreError::invalid_request(format!(
        "unsupported condition `{text}`"
    )))
}

enum SortTerm {
    Eq(Value),
    BeginsWith(String),
}

struct KeyCondition {
    partition_attr: String,
    partition_value: Value,
    sort_attr: Option<String>,
    sort_term: Option<SortTerm>,
}

/// Parse a compiled key condition: partition equality, optionally
/// `AND`-ed with a sort equality or `begins_with`.
fn parse_key_condition(expr: &Expression, schema: &KeySchema) -> StoreResult<KeyCondition> {
    let mut partition: Option<(String, Value)> = None;
    let mut sort: Option<(String, SortTerm)> = None;

    for term in expr.expression.split(" AND ") {
        let term = term.trim();
        if let Some(inner) = term
            .strip_prefix("begins_with(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let (name_ph, value_ph) = inner.split_once(',').ok_or_else(|| {
                StoreError::invalid_request(format!("malformed begins_with `{term}`"))
            })?;
            let attr = resolve_name(expr, name_ph.trim())?.to_string();
            let value = resolve_value(expr, value_ph.trim())?;
            let prefix = value
                .as_text()
                .ok_or_else(|| StoreError::invalid_request("begins_with needs a text value"))?;
            sort = Some((attr, SortTerm::BeginsWith(prefix.to_string())));
        } else if let Some((name_ph, value_ph)) = term.split_once('=') {
            let attr = resolve_name(expr, name_ph.trim())?.to_string();
            let value = resolve_value(expr, value_ph.trim())?.clone();
            if attr == schema.partition {
                partition = Some((attr, value));
            } else {
                sort = Some((attr, SortTerm::Eq(value)));
            }
        } else {
            return Err(StoreError::invalid_request(format!(
                "unsupported key condition term `{term}`"
            )));
        }
    }

    let (partition_attr, partition_value) = partition.ok_or_else(|| {
        StoreError::invalid_request("key condition must constrain the partition attribute")
    })?;

    let (sort_attr, sort_term) = match sort {
        Some((attr, term)) => {
            if schema.sort.as_deref() != Some(attr.as_str()) {
                return Err(StoreError::invalid_request(format!(
                    "`{attr}` is not the index sort attribute"
                )));
            }
            (Some(attr), Some(term))
        }
        None => (None, None),
    };

    Ok(KeyCondition {
        partition_attr,
        partition_value,
        sort_attr,
        sort_term,
    })
}

/// Ordering of items within a query result: sort attribute first (stored
/// order), canonical primary key as tie-break.
fn page_cmp(
    a_sort: Option<&Value>,
    a_canon: &str,
    b_sort: Option<&Value>,
    b_canon: &str,
) -> Ordering {
    match (a_sort, b_sort) {
        (Some(x), Some(y)) => x.cmp_stored(y).then_with(|| a_canon.cmp(b_canon)),
        _ => a_canon.cmp(b_canon),
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, request: GetRequest) -> StoreResult<Option<Item>> {
        self.take_error()?;
        let tables = self.tables.read();
        let state = tables
            .get(&request.table)
            .ok_or_else(|| StoreError::TableNotFound {
                table: request.table.clone(),
            })?;
        let key = key_of(&state.def, &request.key)?;
        let canon = canonical_key(&request.table, &key);
        let item = state.items.get(&canon).cloned();
        drop(tables);
        self.record_fetch(canon);
        Ok(item)
    }

    async fn put(&self, request: PutRequest) -> StoreResult<()> {
        self.take_error()?;
        let mut tables = self.tables.write();
        let state = tables
            .get_mut(&request.table)
            .ok_or_else(|| StoreError::TableNotFound {
                table: request.table.clone(),
            })?;
        let key = key_of(&state.def, &request.item)?;
        let canon = canonical_key(&request.table, &key);

        if let Some(condition) = &request.condition {
            if !eval_condition(condition, state.items.get(&canon))? {
                return Err(StoreError::ConditionFailed);
            }
        }
        state.items.insert(canon, request.item);
        Ok(())
    }

    async fn delete(&self, request: DeleteRequest) -> StoreResult<()> {
        self.take_error()?;
        let mut tables = self.tables.write();
        let state = tables
            .get_mut(&request.table)
            .ok_or_else(|| StoreError::TableNotFound {
                table: request.table.clone(),
            })?;
        let key = key_of(&state.def, &request.key)?;
        let canon = canonical_key(&request.table, &key);

        if let Some(condition) = &request.condition {
            if !eval_condition(condition, state.items.get(&canon))? {
                return Err(StoreError::ConditionFailed);
            }
        }
        state.items.remove(&canon);
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> StoreResult<QueryResponse> {
        self.take_error()?;
        let tables = self.tables.read();
        let state = tables
            .get(&request.table)
            .ok_or_else(|| StoreError::TableNotFound {
                table: request.table.clone(),
            })?;
        let schema = match &request.index {
            Some(index) => state.def.indexes.get(index).ok_or_else(|| {
                StoreError::invalid_request(format!("unknown index `{index}`"))
            })?,
            None => &state.def.primary,
        };

        let condition = parse_key_condition(&request.key_condition, schema)?;
        if condition.partition_attr != schema.partition {
            return Err(StoreError::invalid_request(format!(
                "`{}` is not the index partition attribute",
                condition.partition_attr
            )));
        }

        let mut matching: Vec<(&String, &Item)> = state
            .items
            .iter()
            .filter(|(_, item)| {
                let Some(value) = item.get(&schema.partition) else {
                    return false;
                };
                if *value != condition.partition_value {
                    return false;
                }
                match (&condition.sort_term, &condition.sort_attr) {
                    (Some(term), Some(attr)) => match (item.get(attr), term) {
                        (Some(v), SortTerm::Eq(expected)) => v == expected,
                        (Some(v), SortTerm::BeginsWith(prefix)) => {
                            v.as_text().is_some_and(|s| s.starts_with(prefix.as_str()))
                        }
                        (None, _) => false,
                    },
                    _ => true,
                }
            })
            .collect();

        fn sort_of<'a>(item: &'a Item, sort_attr: &Option<String>) -> Option<&'a Value> {
            sort_attr.as_ref().and_then(|attr| item.get(attr))
        }

        let sort_attr = schema.sort.clone();
        matching.sort_by(|(a_canon, a), (b_canon, b)| {
            page_cmp(
                sort_of(a, &sort_attr),
                a_canon,
                sort_of(b, &sort_attr),
                b_canon,
            )
        });
        if !request.forward {
            matching.reverse();
        }

        if let Some(start) = &request.start_key {
            let start_primary = key_of(&state.def, start)?;
            let start_canon = canonical_key(&request.table, &start_primary);
            let start_sort = sort_of(start, &sort_attr);
            let beyond = matching.iter().position(|(canon, item)| {
                let ord = page_cmp(sort_of(item, &sort_attr), canon, start_sort, &start_canon);
                if request.forward {
                    ord == Ordering::Greater
                } else {
                    ord == Ordering::Less
                }
            });
            matching = match beyond {
                Some(idx) => matching.split_off(idx),
                None => Vec::new(),
            };
        }

        let limit = request.limit.map_or(matching.len(), |n| n as usize);
        let page: Vec<Item> = matching
            .iter()
            .take(limit)
            .map(|(_, item)| (*item).clone())
            .collect();

        let last_key = if matching.len() > page.len() {
            page.last().map(|item| {
                let mut key = Item::new();
                for attr in [Some(&schema.partition), schema.sort.as_ref()]
                    .into_iter()
                    .flatten()
                    .chain(std::iter::once(&state.def.primary.partition))
                    .chain(state.def.primary.sort.as_ref())
                {
                    if let Some(value) = item.get(attr) {
                        key.insert(attr.clone(), value.clone());
                    }
                }
                key
            })
        } else {
            None
        };

        Ok(QueryResponse {
            count: page.len(),
            items: page,
            last_key,
        })
    }

    async fn batch_get(&self, requests: Vec<BatchGetRequest>) -> StoreResult<BatchGetResponse> {
        self.take_error()?;
        if requests.len() > MAX_BATCH_GET_ITEMS {
            return Err(StoreError::BatchTooLarge {
                size: requests.len(),
                max: MAX_BATCH_GET_ITEMS,
            });
        }

        let skip = self.faults.lock().unprocessed.pop_front().unwrap_or(0);
        let processed = requests.len().saturating_sub(skip);
        let (todo, leftover) = requests.split_at(processed);

        let mut found = Vec::new();
        {
            let tables = self.tables.read();
            for request in todo {
                let state =
                    tables
                        .get(&request.table)
                        .ok_or_else(|| StoreError::TableNotFound {
                            table: request.table.clone(),
                        })?;
                let key = key_of(&state.def, &request.key)?;
                let canon = canonical_key(&request.table, &key);
                if let Some(item) = state.items.get(&canon) {
                    found.push((request.clone(), item.clone()));
                }
                self.record_fetch(canon);
            }
        }

        Ok(BatchGetResponse {
            found,
            unprocessed: leftover.to_vec(),
        })
    }

    async fn batch_write(&self, requests: Vec<WriteRequest>) -> StoreResult<BatchWriteResponse> {
        self.take_error()?;
        if requests.len() > MAX_BATCH_WRITE_ITEMS {
            return Err(StoreError::BatchTooLarge {
                size: requests.len(),
                max: MAX_BATCH_WRITE_ITEMS,
            });
        }

        let skip = self.faults.lock().unprocessed.pop_front().unwrap_or(0);
        let processed = requests.len().saturating_sub(skip);
        let leftover = requests[processed..].to_vec();

        let mut tables = self.tables.write();
        for request in &requests[..processed] {
            match request {
                WriteRequest::Put { table, item } => {
                    let state = tables.get_mut(table).ok_or_else(|| {
                        StoreError::TableNotFound {
                            table: table.clone(),
                        }
                    })?;
                    let key = key_of(&state.def, item)?;
                    let canon = canonical_key(table, &key);
                    state.items.insert(canon, item.clone());
                }
                WriteRequest::Delete { table, key } => {
                    let state = tables.get_mut(table).ok_or_else(|| {
                        StoreError::TableNotFound {
                            table: table.clone(),
                        }
                    })?;
                    let key = key_of(&state.def, key)?;
                    let canon = canonical_key(table, &key);
                    state.items.remove(&canon);
                }
            }
        }

        Ok(BatchWriteResponse {
            unprocessed: leftover,
        })
    }
}
