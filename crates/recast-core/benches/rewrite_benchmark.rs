use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use recast_core::ast::build::*;
use recast_core::ast::{BinaryOp, Node};
use recast_core::rewrite::{ec_rules, rewrite_units, run_passes, UnitJob};
use recast_core::{EngineConfig, TypeOracle};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const LIST: &str = "org.eclipse.collections.api.list.MutableList<String>";

/// A class with `methods` methods, each returning one rewritable and one
/// untouched expression
fn generate_unit(methods: usize) -> Node {
    let members = (0..methods)
        .map(|i| {
            let id = i as u32 * 4;
            let xs = typed(ident("xs", id + 1), LIST);
            let p = ident("p", id + 2);
            let body = match i % 4 {
                0 => binary(BinaryOp::Eq, method(xs, "size", vec![]), int(0)),
                1 => not(method(method(xs, "select", vec![p]), "isEmpty", vec![])),
                2 => not(method(xs, "anySatisfy", vec![p])),
                _ => binary(BinaryOp::And, method(xs, "contains", vec![str_lit("a")]), bool_lit(true)),
            };
            method_decl(&format!("check{i}"), vec![], "boolean", vec![ret(body)])
        })
        .collect();
    unit(Some("com.example.bench"), &[], vec![class("Generated", &[], members)])
}

fn bench_single_unit(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_unit");
    let oracle = TypeOracle::standard();
    let rules = ec_rules::catalog();

    for methods in [10, 100, 500] {
        let tree = generate_unit(methods);
        group.bench_with_input(BenchmarkId::new("catalog", methods), &tree, |b, tree| {
            b.iter(|| run_passes(black_box(tree.clone()), &oracle, &rules, 10))
        });
    }
    group.finish();
}

fn bench_fixpoint_input(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixpoint_input");
    let oracle = TypeOracle::standard();
    let rules = ec_rules::catalog();
    let rewritten = run_passes(generate_unit(100), &oracle, &rules, 10).tree;

    // nothing left to rewrite: measures matching cost alone
    group.bench_function("catalog", |b| {
        b.iter(|| run_passes(black_box(rewritten.clone()), &oracle, &rules, 10))
    });
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    let oracle = Arc::new(TypeOracle::standard());
    let rules = ec_rules::catalog();
    let units: Vec<Node> = (0..32).map(|_| generate_unit(50)).collect();

    for workers in [1, 4] {
        let config = EngineConfig::default().with_workers(workers);
        group.bench_with_input(BenchmarkId::new("workers", workers), &units, |b, units| {
            b.iter(|| {
                let jobs = units
                    .iter()
                    .enumerate()
                    .map(|(i, tree)| UnitJob::new(format!("Unit{i}.java"), tree.clone(), oracle.clone()))
                    .collect();
                rewrite_units(jobs, &rules, &config, &AtomicBool::new(false))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_unit, bench_fixpoint_input, bench_batch);
criterion_main!(benches);
