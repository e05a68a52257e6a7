//! Parse throughput benchmark
//!
//! Measures classification alone and full parse sessions over the ZGC and G1
//! fixture logs, replicated to a realistic file size.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench parse_throughput
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gclens::classify::classify;
use gclens::parse_lines;

fn load_fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(path).unwrap()
}

/// Repeat a log, renumbering `GC(n)` so cycles stay distinct
fn replicate(text: &str, copies: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for copy in 0..copies {
        for line in text.lines() {
            lines.push(line.replace("GC(", &format!("GC({}", copy)));
        }
    }
    lines
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    for line in [
        "[0.999s][info][gc,phases] GC(0) Pause Mark Start 1.279ms",
        "[0.316s][info][gc] GC(0) Pause Young (Normal) (G1 Evacuation Pause) 14M->3M(256M) 4.812ms",
        "[1.014s][info][gc,ref   ] GC(0) Weak: 1335 encountered, 757 discovered, 469 enqueued",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(&line[..40]), line, |b, line| {
            b.iter(|| classify(black_box(line)));
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for name in ["sample-ujl-zgc-gc-all.txt", "sample-ujl-g1-gc-all.txt"] {
        let lines = replicate(&load_fixture(name), 100);
        group.throughput(Throughput::Elements(lines.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &lines, |b, lines| {
            b.iter(|| parse_lines(black_box(lines)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_parse);
criterion_main!(benches);
