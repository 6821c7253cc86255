//! Query planning benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use monotable_core::{plan, QueryClause};
use monotable_testkit::fixtures::customers_schema;

fn bench_planner(c: &mut Criterion) {
    let schema = customers_schema();
    let mut group = c.benchmark_group("planner");

    let primary_hit = QueryClause::new()
        .where_field("country", "USA")
        .where_field("state", "UT");
    group.bench_function("primary_prefix", |b| {
        b.iter(|| {
            let index = plan::select_index(&schema, black_box(&primary_hit)).unwrap();
            black_box(index.tag());
        });
    });

    let last_secondary = QueryClause::new().where_field("email", "a@example.com");
    group.bench_function("secondary_scan", |b| {
        b.iter(|| {
            let index = plan::select_index(&schema, black_box(&last_secondary)).unwrap();
            black_box(index.tag());
        });
    });

    let miss = QueryClause::new().where_field("state", "UT");
    group.bench_function("no_match", |b| {
        b.iter(|| {
            let result = plan::select_index(&schema, black_box(&miss));
            black_box(result.is_err());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_planner);
criterion_main!(benches);
