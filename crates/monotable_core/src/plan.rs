//! Index selection for queries.

use std::collections::BTreeSet;

use monotable_codec::present;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::query::QueryClause;
use crate::schema::{IndexDefinition, KeyField, TableSchema};

/// Select the index that serves a query clause.
///
/// With an explicit tag this is a direct lookup. Otherwise indexes are
/// scanned in planning order (primary first, secondaries in declaration
/// order) and the first match wins: an index matches when the
/// predicate's field set is exactly its partition fields plus a
/// contiguous prefix of its sort fields, and, when a sort field is
/// requested, that field is the one immediately after the covered
/// prefix. Deterministic; no cost model.
pub fn select_index<'a>(
    schema: &'a TableSchema,
    clause: &QueryClause,
) -> CoreResult<&'a IndexDefinition> {
    if let Some(tag) = clause.index_tag() {
        return schema
            .index(tag)
            .ok_or_else(|| CoreError::index_not_found(tag, schema.valid_tags()));
    }

    let fields: BTreeSet<&str> = clause
        .predicate()
        .iter()
        .filter(|(field, _)| present(clause.predicate(), field).is_some())
        .map(|(field, _)| field.as_str())
        .collect();

    for index in schema.indexes() {
        if covers(index, &fields, clause.sort_field()) {
            debug!(tag = index.tag(), "selected index");
            return Ok(index);
        }
    }

    Err(CoreError::no_index_for_query(
        schema.type_name(),
        fields.into_iter().map(str::to_string).collect(),
    ))
}

/// Whether `index` exactly covers the predicate field set.
fn covers(index: &IndexDefinition, fields: &BTreeSet<&str>, requested_sort: Option<&str>) -> bool {
    let mut remaining = fields.clone();

    for field in index.partition_fields() {
        if !consume(field, &mut remaining) {
            return false;
        }
    }

    let mut covered = 0;
    for field in index.sort_fields() {
        if consume(field, &mut remaining) {
            covered += 1;
        } else {
            break;
        }
    }

    if !remaining.is_empty() {
        return false;
    }

    match requested_sort {
        Some(sort_field) => index
            .sort_fields()
            .get(covered)
            .is_some_and(|field| field.name() == sort_field),
        None => true,
    }
}

/// Consume a key field's source fields from the remaining set, but only
/// if all of them are available.
fn consume(field: &KeyField, remaining: &mut BTreeSet<&str>) -> bool {
    let sources = field.source_fields();
    if !sources.iter().all(|source| remaining.contains(source)) {
        return false;
    }
    for source in sources {
        remaining.remove(source);
    }
    true
}
