//! Cross-crate integration tests: the access layer driven end-to-end
//! over the in-memory store.

use monotable_codec::{Item, RecordCodec, Value};
use monotable_core::{keys, plan, CoreError, PutMode, QueryClause};
use monotable_testkit::prelude::*;
use proptest::prelude::*;

fn customer(id: &str, country: &str, state: &str, created_at: i64) -> Customer {
    Customer {
        id: id.to_string(),
        country: country.to_string(),
        state: state.to_string(),
        created_at,
        ..sample_customer(id)
    }
}

#[tokio::test]
async fn put_modes_end_to_end() {
    let (repo, _) = customer_repository();
    let ada = sample_customer("ada");

    let err = repo.put(&ada, PutMode::Update).await.unwrap_err();
    assert!(matches!(err, CoreError::ConditionalWrite { .. }));

    repo.put(&ada, PutMode::Create).await.unwrap();
    let err = repo.put(&ada, PutMode::Create).await.unwrap_err();
    assert!(matches!(err, CoreError::ConditionalWrite { .. }));

    repo.put(&ada, PutMode::Update).await.unwrap();
    repo.put(&ada, PutMode::Upsert).await.unwrap();
}

#[tokio::test]
async fn spec_planner_examples() {
    let (repo, _) = customer_repository();
    let schema = repo.schema();

    let clause = QueryClause::new().where_field("country", "USA");
    assert_eq!(plan::select_index(schema, &clause).unwrap().tag(), "primary");

    let clause = QueryClause::new()
        .where_field("country", "USA")
        .where_field("state", "UT");
    assert_eq!(plan::select_index(schema, &clause).unwrap().tag(), "primary");

    let clause = QueryClause::new().where_field("state", "UT");
    assert!(matches!(
        plan::select_index(schema, &clause).unwrap_err(),
        CoreError::NoIndexForQuery { .. }
    ));
}

#[tokio::test]
async fn prefix_queries_narrow_the_partition() {
    let (repo, _) = customer_repository();
    for (id, state) in [("a", "UT"), ("b", "UT"), ("c", "CA")] {
        repo.put(&customer(id, "USA", state, 10), PutMode::Create)
            .await
            .unwrap();
    }

    let whole_country = repo
        .query_all(QueryClause::new().where_field("country", "USA"))
        .await
        .unwrap();
    assert_eq!(whole_country.len(), 3);

    let utah_only = repo
        .query_all(
            QueryClause::new()
                .where_field("country", "USA")
                .where_field("state", "UT"),
        )
        .await
        .unwrap();
    assert_eq!(utah_only.len(), 2);
    assert!(utah_only.iter().all(|c| c.state == "UT"));
}

#[tokio::test]
async fn sparse_index_omits_nonqualifying_items() {
    let (repo, _) = customer_repository();

    let mut no_email = sample_customer("no-email");
    no_email.email = None;
    repo.put(&no_email, PutMode::Create).await.unwrap();

    let mut with_email = customer("mailed", "USA", "CA", 20);
    with_email.email = Some("mailed@example.com".to_string());
    repo.put(&with_email, PutMode::Create).await.unwrap();

    // Absent field: the item never appears in the email index.
    let found = repo
        .query_all(QueryClause::new().where_field("email", "mailed@example.com"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "mailed");

    let found = repo
        .query_all(QueryClause::new().where_field("email", "no-email@example.com"))
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn write_predicate_gates_the_premium_index() {
    let (repo, _) = customer_repository();

    let mut free = customer("free", "USA", "UT", 1);
    free.premium = false;
    let mut paying = customer("paying", "USA", "UT", 2);
    paying.premium = true;
    repo.put(&free, PutMode::Create).await.unwrap();
    repo.put(&paying, PutMode::Create).await.unwrap();

    let premium = repo
        .query_all(
            QueryClause::new()
                .where_field("country", "USA")
                .index("by-premium"),
        )
        .await
        .unwrap();
    assert_eq!(premium.len(), 1);
    assert_eq!(premium[0].id, "paying");

    // Downgrading re-decorates: the item drops out of the index.
    let mut downgraded = paying.clone();
    downgraded.premium = false;
    repo.put(&downgraded, PutMode::Update).await.unwrap();

    let premium = repo
        .query_all(
            QueryClause::new()
                .where_field("country", "USA")
                .index("by-premium"),
        )
        .await
        .unwrap();
    assert!(premium.is_empty());
}

#[tokio::test]
async fn derived_field_index_end_to_end() {
    let (repo, _) = customer_repository();
    let mut ada = sample_customer("ada");
    ada.first_name = "Ada".to_string();
    ada.last_name = "Lovelace".to_string();
    repo.put(&ada, PutMode::Create).await.unwrap();

    let mut grace = customer("grace", "USA", "CA", 30);
    grace.first_name = "Grace".to_string();
    grace.last_name = "Hopper".to_string();
    repo.put(&grace, PutMode::Create).await.unwrap();

    let found = repo
        .query_all(
            QueryClause::new()
                .where_field("country", "USA")
                .where_field("first_name", "Ada")
                .where_field("last_name", "Lovelace"),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "ada");
}

#[tokio::test]
async fn batch_get_preserves_order_and_fetches_once() {
    let (repo, store) = customer_repository();
    let a = customer("a", "USA", "UT", 1);
    let b = customer("b", "USA", "UT", 2);
    let c = customer("c", "USA", "UT", 3);
    repo.batch_put(&[a.clone(), b.clone(), c.clone()])
        .await
        .unwrap();

    let requested = vec![
        key_fields(&a),
        key_fields(&b),
        key_fields(&a),
        key_fields(&c),
    ];
    let results = repo.batch_get_records(&requested).await.unwrap();

    let ids: Vec<Option<&str>> = results
        .iter()
        .map(|r| r.as_ref().map(|c| c.id.as_str()))
        .collect();
    assert_eq!(ids, vec![Some("a"), Some("b"), Some("a"), Some("c")]);

    let a_key = keys::primary_key_attributes(repo.schema(), &key_fields(&a)).unwrap();
    assert_eq!(store.fetch_count("customers", &a_key), 1);
}

#[tokio::test]
async fn batch_write_retries_unprocessed_items() {
    let (repo, store) = customer_repository();
    store.inject_unprocessed([2]);

    let records: Vec<Customer> = (0..5)
        .map(|i| customer(&format!("c{i}"), "USA", "UT", i))
        .collect();
    repo.batch_put(&records).await.unwrap();
    assert_eq!(store.table_len("customers"), 5);
}

#[tokio::test]
async fn cursor_survives_the_caller_roundtrip() {
    let (repo, _) = customer_repository();
    for i in 0..5 {
        repo.put(&customer(&format!("c{i}"), "USA", "UT", i), PutMode::Create)
            .await
            .unwrap();
    }

    let clause = QueryClause::new().where_field("country", "USA").limit(2);
    let first = repo.query(clause.clone()).await.unwrap();
    assert_eq!(first.items.len(), 2);

    // The cursor is an opaque string a caller can store and hand back.
    let token = first.cursor.expect("more pages");
    let second = repo.query(clause.after(token)).await.unwrap();
    assert_eq!(second.items.len(), 2);
    assert_ne!(first.items, second.items);
}

#[tokio::test]
async fn tampered_cursor_is_rejected() {
    let (repo, _) = customer_repository();
    repo.put(&sample_customer("x"), PutMode::Create).await.unwrap();

    let clause = QueryClause::new()
        .where_field("country", "USA")
        .after("bogus-cursor");
    let err = repo.query(clause).await.unwrap_err();
    assert!(matches!(err, CoreError::InputValidation { method: "query", .. }));
}

#[tokio::test]
async fn descending_queries_reverse_the_page_order() {
    let (repo, _) = customer_repository();
    for i in 0..4 {
        repo.put(
            &customer(&format!("c{i}"), "USA", "UT", i),
            PutMode::Create,
        )
        .await
        .unwrap();
    }

    let ascending = repo
        .query_all(QueryClause::new().where_field("country", "USA"))
        .await
        .unwrap();
    let descending = repo
        .query_all(QueryClause::new().where_field("country", "USA").descending())
        .await
        .unwrap();

    let mut reversed = descending.clone();
    reversed.reverse();
    assert_eq!(ascending, reversed);
}

#[tokio::test]
async fn lazy_pages_stop_cleanly() {
    let (repo, _) = customer_repository();
    for i in 0..5 {
        repo.put(&customer(&format!("c{i}"), "USA", "UT", i), PutMode::Create)
            .await
            .unwrap();
    }

    let mut pages = repo.query_pages(QueryClause::new().where_field("country", "USA").limit(2));
    let mut total = 0;
    while let Some(page) = pages.next_page().await.unwrap() {
        total += page.items.len();
    }
    assert_eq!(total, 5);
    // Exhausted pagers stay exhausted.
    assert!(pages.next_page().await.unwrap().is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn paged_query_equals_unpaged_for_any_page_size(
        customers in prop::collection::vec(customer_strategy(), 1..20),
        page_size in page_size_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let (repo, _) = customer_repository();
            for c in &customers {
                repo.put(c, PutMode::Upsert).await.unwrap();
            }

            let clause = QueryClause::new().where_field("country", "USA");
            let unpaged = repo.query_all(clause.clone()).await.unwrap();

            let mut paged = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let mut page_clause = clause.clone().limit(page_size);
                if let Some(token) = &cursor {
                    page_clause = page_clause.after(token.clone());
                }
                let page = repo.query(page_clause).await.unwrap();
                paged.extend(page.items);
                match page.cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }

            assert_eq!(unpaged, paged);
        });
    }

    #[test]
    fn decoration_roundtrips_for_every_eligible_index(
        customer in customer_strategy(),
    ) {
        let schema = customers_schema();
        let record = customer.to_item().unwrap();
        let document = keys::decorate(&schema, &record).unwrap();

        for index in schema.indexes() {
            match keys::index_key_attributes(&schema, index, &record) {
                Ok(attributes) => {
                    let gated_off = index
                        .predicate()
                        .is_some_and(|predicate| !predicate(&record));
                    for (attribute, value) in &attributes {
                        if gated_off {
                            assert!(!document.contains_key(attribute));
                        } else {
                            assert_eq!(document.get(attribute), Some(value));
                        }
                    }
                }
                Err(_) => {
                    // Index fields missing: decoration must have omitted
                    // the attributes entirely.
                    assert!(!document.contains_key(index.partition_attribute()));
                }
            }
        }
    }

    #[test]
    fn planner_matches_are_exact_covers(
        customer in customer_strategy(),
        use_state in any::<bool>(),
        use_email in any::<bool>(),
    ) {
        let schema = customers_schema();
        let mut clause = QueryClause::new().where_field("country", customer.country.clone());
        if use_state {
            clause = clause.where_field("state", customer.state.clone());
        }
        if use_email {
            clause = clause.where_field("email", "x@example.com");
        }

        match plan::select_index(&schema, &clause) {
            Ok(index) => {
                // Every predicate field is consumed by the selected index.
                let mut covered: Vec<&str> = Vec::new();
                for field in index.key_fields() {
                    covered.extend(field.source_fields());
                }
                for field in clause.predicate().keys() {
                    assert!(covered.contains(&field.as_str()));
                }
            }
            Err(err) => assert!(matches!(err, CoreError::NoIndexForQuery { .. })),
        }
    }
}

#[tokio::test]
async fn migration_backfills_legacy_documents() {
    use monotable_store::{PutRequest, StoreClient};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let (repo, store) = customer_repository();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let repo = repo.with_migrator(Arc::new(move |item: &Item| {
        counter.fetch_add(1, Ordering::SeqCst);
        let mut fixed = item.clone();
        // Legacy rows predate the created_at backfill.
        fixed.insert("created_at".to_string(), Value::Integer(0));
        Customer::from_item(&fixed)
            .map_err(|err| CoreError::output_validation("query", Customer::TYPE_NAME, err))
    }));

    let mut legacy = sample_customer("old");
    legacy.created_at = 0;
    let mut raw = legacy.to_item().unwrap();
    raw.insert("created_at".to_string(), Value::Integer(-1));
    let document = keys::decorate(repo.schema(), &raw).unwrap();
    store
        .put(PutRequest {
            table: "customers".to_string(),
            item: document,
            condition: None,
        })
        .await
        .unwrap();

    let found = repo
        .query_all(QueryClause::new().where_field("country", "USA"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].created_at, 0);
    // One logical fetch, one migration.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
