//! Conversion throughput: reading, the uncached pipeline, and cache hits.
//!
//! Run with: cargo bench -p brace-bench --bench convert

use brace_syntax::{PYTHON_READER, Reader};
use brace_transpile::{Config, Pipeline, PluginChain};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const UNIT: &str = "\
class Account:
    def __init__(self, owner: str, balance: float):
        self.owner = owner
        self.balance = balance
        self.history = []

    def deposit(self, amount: float):
        self.balance += amount
        self.history.append(amount)

    def report(self) -> str:
        return f\"{self.owner}: {self.balance}\"


def total(values):
    result = 0
    for v in values:
        if v > 0:
            result += v
    return result


squares = [n * n for n in range(100)]
print(total(squares))
";

/// `copies` renamed repetitions of [`UNIT`].
fn source(copies: usize) -> String {
    (0..copies)
        .map(|i| {
            UNIT.replace("Account", &format!("Account{i}"))
                .replace("total", &format!("total{i}"))
                .replace("squares", &format!("squares{i}"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    for copies in [1, 10, 50] {
        let text = source(copies);
        group.bench_with_input(BenchmarkId::from_parameter(copies), &text, |b, text| {
            b.iter(|| black_box(PYTHON_READER.read(black_box(text))));
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let Ok(pipeline) = Pipeline::new(Config::default(), PluginChain::empty()) else {
        return;
    };
    for copies in [1, 10, 50] {
        let Ok(tree) = PYTHON_READER.read(&source(copies)) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::new("uncached", copies), &tree, |b, tree| {
            b.iter(|| black_box(pipeline.run(black_box(tree))));
        });
        group.bench_with_input(BenchmarkId::new("cached", copies), &tree, |b, tree| {
            b.iter(|| black_box(pipeline.convert(black_box(tree))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_read, bench_pipeline);
criterion_main!(benches);
