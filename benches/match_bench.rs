//! Benchmark: tree-walk matching vs. the regex fast path on a small
//! request grammar, plus grammar compilation itself. The fast path only
//! answers yes/no, so the comparison shows what the sub-match tree costs.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ruleweave::compile;

const REQUEST: &str = r#"
request = method SP path SP version
method = "GET" / "PUT" / "POST"
path = "/" *pchar
pchar = ALPHA / DIGIT / "/" / "." / "_"
version = "HTTP/" DIGIT "." DIGIT
"#;

const INPUT: &str = "GET /benchmarks/match_bench.rs HTTP/1.1";

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_grammar", |b| {
        b.iter(|| compile(black_box(REQUEST)).expect("compile"))
    });
}

fn bench_match(c: &mut Criterion) {
    let grammar = compile(REQUEST).expect("compile");
    c.bench_function("tree_match", |b| {
        b.iter(|| {
            grammar
                .match_rule("request", black_box(INPUT))
                .expect("match")
        })
    });

    let rule = grammar.rule("request").expect("rule");
    rule.regex(&grammar).expect("regex");
    c.bench_function("regex_quick_match", |b| {
        b.iter(|| {
            rule.quick_match(&grammar, black_box(INPUT))
                .expect("quick match")
        })
    });
}

criterion_group!(benches, bench_compile, bench_match);
criterion_main!(benches);
