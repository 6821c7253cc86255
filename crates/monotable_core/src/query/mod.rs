//! Query building and pagination.

mod clause;
pub(crate) mod cursor;

pub use clause::{Direction, QueryClause};

use monotable_codec::{Item, Value};
use monotable_store::{QueryRequest, StoreClient};

use crate::error::CoreResult;
use crate::expr::AttributeRegistry;
use crate::keys;
use crate::repository::Repository;
use crate::schema::{IndexDefinition, TableSchema};
use monotable_codec::RecordCodec;

/// One page of typed query results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items in the requested sort order.
    pub items: Vec<T>,
    /// Opaque cursor for the next page, when more items remain.
    pub cursor: Option<String>,
}

/// Compile a planned query into a store request.
///
/// The partition attribute gets an equality condition on the encoded
/// partition key; when the index has a sort attribute, the sort key
/// prefix covered by the predicate becomes a `begins_with` condition.
/// Note that `begins_with` is textual: tokens sharing a text prefix
/// bleed into each other's matches, which is why numeric fields are
/// zero-padded.
pub(crate) fn compile(
    schema: &TableSchema,
    index: &IndexDefinition,
    clause: &QueryClause,
    start_key: Option<Item>,
) -> CoreResult<QueryRequest> {
    let mut registry = AttributeRegistry::new();

    let partition = keys::partition_key_value(schema, index, clause.predicate())?;
    let partition_name = registry.name(index.partition_attribute());
    let partition_value = registry.value(Value::Text(partition));
    let mut expression = format!("{partition_name} = {partition_value}");

    if let Some(sort_attribute) = index.sort_attribute() {
        let prefix = keys::sort_key_value(schema, index, clause.predicate());
        let sort_name = registry.name(sort_attribute);
        let sort_value = registry.value(Value::Text(prefix));
        expression.push_str(&format!(" AND begins_with({sort_name}, {sort_value})"));
    }

    Ok(QueryRequest {
        table: schema.table_name().to_string(),
        index: if index.is_primary() {
            None
        } else {
            Some(index.tag().to_string())
        },
        key_condition: registry.into_expression(expression),
        forward: clause.sort_direction() == Direction::Ascending,
        limit: clause.page_limit(),
        start_key,
    })
}

/// Lazy forward-only pager over a query.
///
/// Each [`Pages::next_page`] call suspends on exactly one store round
/// trip. Dropping the pager is cancellation; the store keeps no
/// server-side state for it.
pub struct Pages<'r, T: RecordCodec, S: StoreClient> {
    repository: &'r Repository<T, S>,
    clause: QueryClause,
    done: bool,
}

impl<'r, T: RecordCodec, S: StoreClient> Pages<'r, T, S> {
    pub(crate) fn new(repository: &'r Repository<T, S>, clause: QueryClause) -> Self {
        Self {
            repository,
            clause,
            done: false,
        }
    }

    /// Fetch the next page, or `None` once the result set is exhausted.
    pub async fn next_page(&mut self) -> CoreResult<Option<Page<T>>> {
        if self.done {
            return Ok(None);
        }
        let page = self.repository.query(self.clause.clone()).await?;
        match &page.cursor {
            Some(cursor) => self.clause = self.clause.clone().after(cursor.clone()),
            None => self.done = true,
        }
        Ok(Some(page))
    }
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
                    .field(KeyField::source("state")),
            )
            .secondary(
                IndexDefinition::new("by-email", IndexKind::Global, "gsi1_pk")
                    .field(KeyField::source("email")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn compile_partition_and_prefix() {
        let schema = schema();
        let clause = QueryClause::new()
            .where_field("country", "USA")
            .where_field("state", "UT")
            .limit(10);

        let request = compile(&schema, schema.primary(), &clause, None).unwrap();
        assert_eq!(request.table, "app-table");
        assert_eq!(request.index, None);
        assert!(request.forward);
        assert_eq!(request.limit, Some(10));
        assert_eq!(
            request.key_condition.expression,
            "#n0 = :v0 AND begins_with(#n1, :v1)"
        );
        assert_eq!(
            request.key_condition.values.get(":v0"),
            Some(&Value::from("User#country-USA"))
        );
        assert_eq!(
            request.key_condition.values.get(":v1"),
            Some(&Value::from("User#state-UT"))
        );
    }

    #[test]
    fn compile_secondary_index_without_sort() {
        let schema = schema();
        let clause = QueryClause::new().where_field("email", "a@b.c");
        let index = schema.index("by-email").unwrap();

        let request = compile(&schema, index, &clause, None).unwrap();
        assert_eq!(request.index.as_deref(), Some("by-email"));
        assert_eq!(request.key_condition.expression, "#n0 = :v0");
    }

    #[test]
    fn compile_descending() {
        let schema = schema();
        let clause = QueryClause::new().where_field("country", "USA").descending();
        let request = compile(&schema, schema.primary(), &clause, None).unwrap();
        assert!(!request.forward);
    }
}
