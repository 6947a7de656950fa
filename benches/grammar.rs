//! Grammar Compiler Benchmarks
//!
//! - Compiling the trips schema into its rule set
//! - Rendering the compiled grammar as Lark text
//! - Sampling sentences at several depth budgets
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench --bench grammar
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlfence::grammar::compile;
use sqlfence::schema::TableSchema;

fn bench_compile(c: &mut Criterion) {
    let schema = TableSchema::trips().unwrap();
    c.bench_function("compile_trips", |b| b.iter(|| compile(black_box(&schema)).unwrap()));

    let grammar = compile(&schema).unwrap();
    c.bench_function("to_lark", |b| b.iter(|| black_box(&grammar).to_lark()));
}

fn bench_sample(c: &mut Criterion) {
    let grammar = compile(&TableSchema::trips().unwrap()).unwrap();

    let mut group = c.benchmark_group("sample");
    for depth in [4usize, 12, 24] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut rng = StdRng::seed_from_u64(17);
            b.iter(|| grammar.sample(&mut rng, depth))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_sample);
criterion_main!(benches);
