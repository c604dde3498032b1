use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use quarry_core::expr::{Expr, Method, Parameter};
use quarry_core::serialization::{ClassMap, Codec, InMemoryRegistry};
use quarry_engine::QueryTranslator;

// =============================================================================
// Fixtures
// =============================================================================

fn translator() -> QueryTranslator {
    let registry = InMemoryRegistry::from_class_maps([
        ClassMap::new("Animal")
            .as_root()
            .map_member("Name", "name", Codec::String)
            .map_member("Age", "age", Codec::int32())
            .map_member("Tags", "tags", Codec::array(Codec::String)),
        ClassMap::new("Cat")
            .with_base("Animal")
            .map_member("Lives", "lives", Codec::int32()),
    ]);
    QueryTranslator::new(Arc::new(registry))
}

fn chain() -> Expr {
    let c = Parameter::new("c", "Cat");
    let x = || Expr::parameter(&c);
    let predicate = x()
        .member("Age")
        .greater_than(Expr::constant(3))
        .and_also(
            x().member("Name")
                .call(Method::ToLower, vec![])
                .call(Method::StartsWith, vec![Expr::constant("tom")]),
        )
        .and_also(Expr::not(
            x().member("Tags").member("Count").equal(Expr::constant(0)),
        ))
        .or_else(x().member("Lives").less_or_equal(Expr::constant(1)));
    Expr::source("Animal")
        .apply(
            Method::OfType,
            vec![Expr::constant(quarry_common::Value::Type("Cat".into()))],
        )
        .apply(Method::Where, vec![Expr::lambda(c.clone(), predicate)])
        .apply(
            Method::OrderBy,
            vec![Expr::lambda(c.clone(), x().member("Name"))],
        )
        .apply(Method::Skip, vec![Expr::constant(20)])
        .apply(Method::Take, vec![Expr::constant(10)])
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_translate(c: &mut Criterion) {
    let translator = translator();
    let chain = chain();

    c.bench_function("translate_model", |b| {
        b.iter(|| translator.translate(black_box(&chain)))
    });

    let model = translator.translate(&chain).unwrap();
    c.bench_function("assemble_query", |b| {
        b.iter(|| translator.compile(black_box(&model)))
    });

    c.bench_function("compile_chain", |b| {
        b.iter(|| translator.compile_chain(black_box(&chain)))
    });
}

criterion_group!(benches, bench_translate);
criterion_main!(benches);
