//! Store client trait definition.

use async_trait::async_trait;
use monotable_codec::Item;

use crate::error::StoreResult;
use crate::types::{
    BatchGetRequest, BatchGetResponse, BatchWriteResponse, DeleteRequest, GetRequest, PutRequest,
    QueryRequest, QueryResponse, WriteRequest,
};

/// A client for the physical hash/range key-value store.
///
/// This is the boundary of the access layer: everything above it is
/// mapping, planning, and orchestration; everything below it is the
/// store service. The trait is runtime-agnostic and uses `async_trait`
/// for async support.
///
/// # Contract
///
/// - `get`/`put`/`delete` address items by their full primary key.
/// - `query` evaluates a key condition (partition equality plus an
///   optional sort condition) against one index and returns items in
///   stored sort order with an optional continuation key.
/// - `batch_get`/`batch_write` may return a partial "unprocessed" subset
///   instead of failing; the caller resubmits those. Any other failure is
///   a hard error.
/// - Implementations own timeouts, credentials, and transport retries;
///   the access layer never retries single-item calls.
///
/// # Implementors
///
/// - [`crate::MemoryStore`] - in-memory emulation for tests
/// - Production deployments wrap their store SDK's client.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Reads one item by primary key, if present.
    async fn get(&self, request: GetRequest) -> StoreResult<Option<Item>>;

    /// Stores one item, replacing any existing item with the same key.
    ///
    /// When a condition is supplied it is evaluated against the current
    /// item (or its absence) atomically with the write; a failed
    /// condition is [`crate::StoreError::ConditionFailed`].
    async fn put(&self, request: PutRequest) -> StoreResult<()>;

    /// Deletes one item by primary key. Deleting an absent item succeeds.
    async fn delete(&self, request: DeleteRequest) -> StoreResult<()>;

    /// Runs one page of an index query.
    async fn query(&self, request: QueryRequest) -> StoreResult<QueryResponse>;

    /// Reads up to [`crate::MAX_BATCH_GET_ITEMS`] items in one call.
    ///
    /// Keys the store declines to process this round come back in
    /// `unprocessed` rather than erroring.
    async fn batch_get(&self, requests: Vec<BatchGetRequest>) -> StoreResult<BatchGetResponse>;

    /// Applies up to [`crate::MAX_BATCH_WRITE_ITEMS`] writes in one call.
    ///
    /// Writes the store declines to process this round come back in
    /// `unprocessed` rather than erroring.
    async fn batch_write(&self, requests: Vec<WriteRequest>) -> StoreResult<BatchWriteResponse>;
}
