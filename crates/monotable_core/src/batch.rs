//! Batch get and batch write over the store's bulk primitives.
//!
//! Both paths share the same discipline: chunk to the store's per-call
//! cap, then loop resubmitting only the store-reported unprocessed
//! subset until none remain. That loop is the only automatic retry in
//! the access layer; any hard error aborts it and propagates, and items
//! are never silently dropped.

use std::collections::{BTreeMap, BTreeSet};

use monotable_codec::Item;
use monotable_store::{
    canonical_key, BatchGetRequest, StoreClient, WriteRequest, MAX_BATCH_GET_ITEMS,
    MAX_BATCH_WRITE_ITEMS,
};
use tracing::debug;

use crate::error::CoreResult;

/// Fetch items for an ordered list of keys, possibly with duplicates.
///
/// Requests are deduplicated by table plus canonicalized key before
/// hitting the store; the result vector is in the caller's original
/// order with duplicates repeated, `None` marking absent items.
pub async fn batch_get_items<S: StoreClient>(
    store: &S,
    requests: &[BatchGetRequest],
) -> CoreResult<Vec<Option<Item>>> {
    let mut order = Vec::with_capacity(requests.len());
    let mut unique = Vec::new();
    let mut seen = BTreeSet::new();
    for request in requests {
        let canon = canonical_key(&request.table, &request.key);
        if seen.insert(canon.clone()) {
            unique.push(request.clone());
        }
        order.push(canon);
    }

    let mut fetched: BTreeMap<String, Item> = BTreeMap::new();
    for chunk in unique.chunks(MAX_BATCH_GET_ITEMS) {
        let mut pending = chunk.to_vec();
        while !pending.is_empty() {
            let response = store.batch_get(pending).await?;
            for (request, item) in response.found {
                fetched.insert(canonical_key(&request.table, &request.key), item);
            }
            pending = response.unprocessed;
            if !pending.is_empty() {
                debug!(remaining = pending.len(), "resubmitting unprocessed batch get keys");
            }
        }
    }

    Ok(order
        .into_iter()
        .map(|canon| fetched.get(&canon).cloned())
        .collect())
}

/// Apply a list of puts and deletes through the store's batch channel.
pub async fn batch_write_items<S: StoreClient>(
    store: &S,
    requests: Vec<WriteRequest>,
) -> CoreResult<()> {
    for chunk in requests.chunks(MAX_BATCH_WRITE_ITEMS) {
        let mut pending = chunk.to_vec();
        while !pending.is_empty() {
            let response = store.batch_write(pending).await?;
            pending = response.unprocessed;
            if !pending.is_empty() {
                debug!(
                    remaining = pending.len(),
                    "resubmitting unprocessed batch writes"
                );
            }
        }
    }
    Ok(())
}
