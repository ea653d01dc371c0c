// Criterion benchmarks for compiling and searching.
//
// Run: cargo bench
// HTML report: target/criterion/report/index.html

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use regrep::{compile, CompiledPattern};

const PATTERNS: &[(&str, &str)] = &[
    ("literal", "needle"),
    ("class", r"[a-f\d]+z"),
    ("alternation", "(cat|dog|bird)s?"),
    ("backref", r"(\w+) \1"),
];

fn haystack() -> String {
    let mut text = "lorem ipsum dolor sit amet ".repeat(200);
    text.push_str("the the needle deadbeefz birds");
    text
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for (name, pattern) in PATTERNS {
        group.bench_with_input(BenchmarkId::from_parameter(name), pattern, |b, pattern| {
            b.iter(|| compile(black_box(pattern)))
        });
    }
    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let text = haystack();
    let mut group = c.benchmark_group("find");
    for (name, pattern) in PATTERNS {
        let re = CompiledPattern::new(pattern).expect("benchmark pattern compiles");
        group.bench_with_input(BenchmarkId::from_parameter(name), &re, |b, re| {
            b.iter(|| re.find(black_box(&text)))
        });
    }
    group.finish();
}

fn bench_backtracking(c: &mut Criterion) {
    let re = CompiledPattern::new("a*a*a*b").expect("benchmark pattern compiles");
    let text = "a".repeat(24);
    c.bench_function("backtracking/no_match", |b| {
        b.iter(|| re.matches(black_box(&text)))
    });
}

criterion_group!(benches, bench_compile, bench_find, bench_backtracking);
criterion_main!(benches);
