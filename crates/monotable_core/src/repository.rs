//! Repository: typed orchestration of the access layer.

use std::marker::PhantomData;
use std::sync::Arc;

use monotable_codec::{CodecError, FieldViolation, Item, RecordCodec};
use monotable_store::{
    canonical_key, BatchGetRequest, DeleteRequest, Expression, GetRequest, PutRequest,
    StoreClient, StoreError, WriteRequest,
};
use tracing::debug;

use crate::batch;
use crate::error::{CoreError, CoreResult};
use crate::expr::AttributeRegistry;
use crate::keys;
use crate::loader::{Claim, KeyCache};
use crate::plan;
use crate::query::{cursor, Page, Pages, QueryClause};
use crate::schema::TableSchema;

/// How a put treats an existing item with the same primary key.
///
/// The mode is a mandatory argument: there is no default, so a caller
/// can never overwrite silently by omission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutMode {
    /// Fail with a conditional write error if the key already exists.
    Create,
    /// Fail with a conditional write error if the key does not exist.
    Update,
    /// Write unconditionally.
    Upsert,
}

/// Read-time migration hook.
///
/// Invoked when a stored item fails schema validation; may transform or
/// backfill the raw attributes into a valid record. Fires at most once
/// per logical fetch of an item.
pub type Migrator<T> = Arc<dyn Fn(&Item) -> CoreResult<T> + Send + Sync>;

/// A typed repository over one table schema and one store client.
///
/// All configuration is explicit and owned by the value: the schema,
/// the store handle, the optional migration hook, and the optional
/// request-coalescing cache. There is no process-wide state.
pub struct Repository<T: RecordCodec, S: StoreClient> {
    schema: Arc<TableSchema>,
    store: Arc<S>,
    migrator: Option<Migrator<T>>,
    cache: Option<KeyCache>,
    _record: PhantomData<fn() -> T>,
}

impl<T: RecordCodec, S: StoreClient> Repository<T, S> {
    /// Create a repository from its schema and store client.
    pub fn new(schema: TableSchema, store: Arc<S>) -> Self {
        Self {
            schema: Arc::new(schema),
            store,
            migrator: None,
            cache: None,
            _record: PhantomData,
        }
    }

    /// Install a read-time migration hook.
    #[must_use]
    pub fn with_migrator(mut self, migrator: Migrator<T>) -> Self {
        self.migrator = Some(migrator);
        self
    }

    /// Enable the request-coalescing cache.
    #[must_use]
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(KeyCache::new());
        self
    }

    /// The table schema.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Drop every completed cache entry, ending the logical batch window.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Fetch one record by its primary key fields.
    pub async fn get(&self, key_fields: &Item) -> CoreResult<Option<T>> {
        match self.get_raw(key_fields).await? {
            Some(item) => Ok(Some(self.decode("get", &item)?)),
            None => Ok(None),
        }
    }

    /// Whether an item exists under these primary key fields.
    pub async fn exists(&self, key_fields: &Item) -> CoreResult<bool> {
        Ok(self.get_raw(key_fields).await?.is_some())
    }

    /// Store a record under the given mode. Returns the record as
    /// re-parsed from the stored document.
    pub async fn put(&self, record: &T, mode: PutMode) -> CoreResult<T> {
        const METHOD: &str = "put";
        let item = record
            .to_item()
            .map_err(|err| CoreError::input_validation(METHOD, T::TYPE_NAME, err))?;
        let document = keys::decorate(&self.schema, &item)?;

        let request = PutRequest {
            table: self.schema.table_name().to_string(),
            item: document.clone(),
            condition: self.mode_condition(mode),
        };
        match self.store.put(request).await {
            Ok(()) => {}
            Err(StoreError::ConditionFailed) => {
                return Err(CoreError::conditional_write(METHOD, T::TYPE_NAME));
            }
            Err(err) => return Err(err.into()),
        }

        self.cache_document(&document);
        self.decode(METHOD, &document)
    }

    /// Delete one item by its primary key fields. Deleting an absent
    /// item succeeds.
    pub async fn delete(&self, key_fields: &Item) -> CoreResult<()> {
        let key = keys::primary_key_attributes(&self.schema, key_fields)?;
        self.store
            .delete(DeleteRequest {
                table: self.schema.table_name().to_string(),
                key: key.clone(),
                condition: None,
            })
            .await?;

        if let Some(cache) = &self.cache {
            cache.store(&canonical_key(self.schema.table_name(), &key), None);
        }
        Ok(())
    }

    /// Shallow-merge `patch` into the stored record, or into `default`
    /// when nothing is stored. Merging into a missing item with no
    /// default fails with a dedicated error.
    pub async fn merge(
        &self,
        key_fields: &Item,
        patch: Item,
        default: Option<T>,
    ) -> CoreResult<T> {
        const METHOD: &str = "merge";
        T::validate_partial(&patch)
            .map_err(|err| CoreError::input_validation(METHOD, T::TYPE_NAME, err))?;

        let mut base = match self.get_raw(key_fields).await? {
            Some(item) => item,
            None => match default {
                Some(record) => record
                    .to_item()
                    .map_err(|err| CoreError::input_validation(METHOD, T::TYPE_NAME, err))?,
                None => return Err(CoreError::merge_missing_target(METHOD, T::TYPE_NAME)),
            },
        };
        for (field, value) in patch {
            base.insert(field, value);
        }

        let record = T::from_item(&base)
            .map_err(|err| CoreError::input_validation(METHOD, T::TYPE_NAME, err))?;
        let item = record
            .to_item()
            .map_err(|err| CoreError::input_validation(METHOD, T::TYPE_NAME, err))?;
        let document = keys::decorate(&self.schema, &item)?;

        self.store
            .put(PutRequest {
                table: self.schema.table_name().to_string(),
                item: document.clone(),
                condition: None,
            })
            .await?;

        self.cache_document(&document);
        Ok(record)
    }

    /// Run one page of a query.
    pub async fn query(&self, clause: QueryClause) -> CoreResult<Page<T>> {
        const METHOD: &str = "query";
        let index = plan::select_index(&self.schema, &clause)?;
        let start_key = match clause.cursor() {
            Some(token) => Some(cursor::decode(self.schema.type_name(), token)?),
            None => None,
        };
        let request = crate::query::compile(&self.schema, index, &clause, start_key)?;
        let response = self.store.query(request).await?;

        let mut items = Vec::with_capacity(response.items.len());
        for item in &response.items {
            self.cache_document(item);
            items.push(self.decode(METHOD, item)?);
        }
        let next = match &response.last_key {
            Some(key) => Some(cursor::encode(self.schema.type_name(), key)?),
            None => None,
        };
        Ok(Page {
            items,
            cursor: next,
        })
    }

    /// Fetch every page of a query eagerly.
    ///
    /// **Warning**: this accumulates the whole result set in memory.
    /// Callers are responsible for bounding it; for unbounded result
    /// sets use [`Repository::query_pages`].
    pub async fn query_all(&self, clause: QueryClause) -> CoreResult<Vec<T>> {
        let mut results = Vec::new();
        let mut pages = self.query_pages(clause);
        while let Some(page) = pages.next_page().await? {
            results.extend(page.items);
        }
        Ok(results)
    }

    /// Iterate a query lazily, one store round trip per page.
    pub fn query_pages(&self, clause: QueryClause) -> Pages<'_, T, S> {
        Pages::new(self, clause)
    }

    /// Count the items a query matches by walking its pages without
    /// decoding them.
    ///
    /// **Warning**: this walks the whole matching key range.
    pub async fn count(&self, clause: QueryClause) -> CoreResult<usize> {
        let index = plan::select_index(&self.schema, &clause)?;
        let mut total = 0;
        let mut start_key = match clause.cursor() {
            Some(token) => Some(cursor::decode(self.schema.type_name(), token)?),
            None => None,
        };
        loop {
            let request = crate::query::compile(&self.schema, index, &clause, start_key.take())?;
            let response = self.store.query(request).await?;
            total += response.count;
            match response.last_key {
                Some(key) => start_key = Some(key),
                None => return Ok(total),
            }
        }
    }

    /// Fetch many records by primary key fields, preserving order and
    /// duplicates while deduplicating store traffic.
    pub async fn batch_get_records(&self, keys_list: &[Item]) -> CoreResult<Vec<Option<T>>> {
        const METHOD: &str = "batch_get";
        let mut requests = Vec::with_capacity(keys_list.len());
        for key_fields in keys_list {
            requests.push(BatchGetRequest {
                table: self.schema.table_name().to_string(),
                key: keys::primary_key_attributes(&self.schema, key_fields)?,
            });
        }

        let raw = batch::batch_get_items(self.store.as_ref(), &requests).await?;
        raw.into_iter()
            .map(|entry| match entry {
                Some(item) => {
                    self.cache_document(&item);
                    self.decode(METHOD, &item).map(Some)
                }
                None => Ok(None),
            })
            .collect()
    }

    /// Store many records through the batch channel.
    ///
    /// The store's batch writes carry no conditions, so this path is
    /// upsert-only; use [`Repository::put`] for create/update semantics.
    pub async fn batch_put(&self, records: &[T]) -> CoreResult<()> {
        const METHOD: &str = "batch_put";
        let mut writes = Vec::with_capacity(records.len());
        for record in records {
            let item = record
                .to_item()
                .map_err(|err| CoreError::input_validation(METHOD, T::TYPE_NAME, err))?;
            let document = keys::decorate(&self.schema, &item)?;
            self.cache_document(&document);
            writes.push(WriteRequest::Put {
                table: self.schema.table_name().to_string(),
                item: document,
            });
        }
        batch::batch_write_items(self.store.as_ref(), writes).await
    }

    /// Delete many items by primary key fields through the batch channel.
    pub async fn batch_delete(&self, keys_list: &[Item]) -> CoreResult<()> {
        let mut writes = Vec::with_capacity(keys_list.len());
        for key_fields in keys_list {
            let key = keys::primary_key_attributes(&self.schema, key_fields)?;
            if let Some(cache) = &self.cache {
                cache.store(&canonical_key(self.schema.table_name(), &key), None);
            }
            writes.push(WriteRequest::Delete {
                table: self.schema.table_name().to_string(),
                key,
            });
        }
        batch::batch_write_items(self.store.as_ref(), writes).await
    }

    /// Fetch the raw stored document for primary key fields, going
    /// through the coalescing cache when enabled.
    async fn get_raw(&self, key_fields: &Item) -> CoreResult<Option<Item>> {
        let key = keys::primary_key_attributes(&self.schema, key_fields)?;
        let request = GetRequest {
            table: self.schema.table_name().to_string(),
            key: key.clone(),
        };

        let Some(cache) = &self.cache else {
            return Ok(self.store.get(request).await?);
        };

        let canon = canonical_key(self.schema.table_name(), &key);
        loop {
            match cache.claim(&canon) {
                Claim::Hit(item) => return Ok(item),
                Claim::Wait(rx) => match rx.await {
                    Ok(item) => return Ok(item),
                    // The owning fetch failed; claim again and retry.
                    Err(_) => continue,
                },
                Claim::Fetch => match self.store.get(request.clone()).await {
                    Ok(item) => {
                        cache.complete(&canon, item.clone());
                        return Ok(item);
                    }
                    Err(err) => {
                        cache.abandon(&canon);
                        return Err(err.into());
                    }
                },
            }
        }
    }

    /// Decode a stored document, routing validation failures through the
    /// migration hook when one is installed.
    fn decode(&self, method: &'static str, item: &Item) -> CoreResult<T> {
        match T::from_item(item) {
            Ok(record) => Ok(record),
            Err(CodecError::Validation { violations, .. }) => match &self.migrator {
                Some(migrator) => {
                    debug!(
                        method,
                        type_name = T::TYPE_NAME,
                        "stored item failed validation; invoking migration hook"
                    );
                    migrator(item)
                }
                None => Err(CoreError::OutputValidation {
                    method,
                    type_name: T::TYPE_NAME.to_string(),
                    violations,
                }),
            },
            Err(other) => Err(CoreError::OutputValidation {
                method,
                type_name: T::TYPE_NAME.to_string(),
                violations: vec![FieldViolation::new("$", other.to_string())],
            }),
        }
    }

    /// Compile a put mode into a condition over primary-key existence.
    fn mode_condition(&self, mode: PutMode) -> Option<Expression> {
        let function = match mode {
            PutMode::Upsert => return None,
            PutMode::Create => "attribute_not_exists",
            PutMode::Update => "attribute_exists",
        };
        let mut registry = AttributeRegistry::new();
        let name = registry.name(self.schema.primary().partition_attribute());
        Some(registry.into_expression(format!("{function}({name})")))
    }

    /// Update the cache entry for a freshly observed document.
    fn cache_document(&self, document: &Item) {
        if let Some(cache) = &self.cache {
            if let Some(key) = keys::extract_primary_key(&self.schema, document) {
                cache.store(
                    &canonical_key(self.schema.table_name(), &key),
                    Some(document.clone()),
                );
            }
        }
    }
}
