//! Property-based tests for classification, parsing and statistics
//!
//! Core features tested:
//! 1. Line classification is deterministic and total
//! 2. Feeding arbitrary text never panics
//! 3. Every event lands in exactly one partition
//! 4. Missing fields never disturb other statistics
//! 5. Memory unit normalization
//! 6. Statistic bucket invariants
//! 7. Events come out in non-decreasing timestamp order

use gclens::classify::classify;
use gclens::units::{parse_kilobytes, MemoryUnit};
use gclens::{parse_lines, EventKind, GcLogParser, Partition, StatBucket};
use proptest::prelude::*;

const PHASE_LINES: [&str; 10] = [
    "GC({id}) Pause Mark Start {ms}ms",
    "GC({id}) Concurrent Mark {ms}ms",
    "GC({id}) Pause Young (Normal) (G1 Evacuation Pause)",
    "GC({id}) Pause Young (Normal) (G1 Evacuation Pause) {mb}M->{mb}M(256M) {ms}ms",
    "GC({id}) Pause Full (System.gc()) {mb}M->{mb}M(512M) {ms}ms",
    "GC({id}) Concurrent Cycle",
    "GC({id}) Concurrent Cycle {ms}ms",
    "GC({id}) Concurrent Mark",
    "GC({id}) Garbage Collection (Warmup) {mb}M(1%)->{mb}M(1%)",
    "GC({id})  Capacity:  {mb}M (100%)",
];

fn phase_line() -> impl Strategy<Value = String> {
    (0usize..PHASE_LINES.len(), 0u64..8, 0u32..100_000, 1u64..4096, 0u32..10_000).prop_map(
        |(template, id, ms, mb, uptime)| {
            format!(
                "[{}.{:03}s][info][gc] {}",
                uptime / 1000,
                uptime % 1000,
                PHASE_LINES[template]
                    .replace("{id}", &id.to_string())
                    .replace("{ms}", &format!("{}.{:03}", ms / 1000, ms % 1000))
                    .replace("{mb}", &mb.to_string())
            )
        },
    )
}

fn uptime_millis(line: &str) -> u64 {
    let seconds = &line[1..line.find("s]").unwrap()];
    let (whole, fraction) = seconds.split_once('.').unwrap();
    whole.parse::<u64>().unwrap() * 1000 + fraction.parse::<u64>().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_classify_is_idempotent(line in ".{0,120}") {
        // Property: classification is a pure function of the line
        prop_assert_eq!(classify(&line), classify(&line));
    }

    #[test]
    fn prop_classify_known_lines_is_idempotent(line in phase_line()) {
        let first = classify(&line);
        prop_assert!(first.is_recognized());
        prop_assert_eq!(first, classify(&line));
    }

    #[test]
    fn prop_feed_never_panics(lines in prop::collection::vec(".{0,200}", 0..50)) {
        let mut parser = GcLogParser::new();
        for line in &lines {
            parser.feed(line);
        }
        let (model, stats) = parser.finish_with_stats();
        prop_assert_eq!(stats.lines, lines.len() as u64);
        prop_assert_eq!(stats.recognized + stats.unrecognized, stats.lines);
        prop_assert!(model.size() as u64 <= stats.recognized);
    }

    #[test]
    fn prop_decorated_noise_never_panics(
        tags in "[a-z,]{0,20}",
        body in "[ -~]{0,80}",
    ) {
        let line = format!("[1.0s][info][{}] GC(1) {}", tags, body);
        let _ = parse_lines([line]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_partitions_are_total(lines in prop::collection::vec(phase_line(), 0..60)) {
        // Property: every event is counted in exactly one partition
        let model = parse_lines(&lines);
        let mut per_partition = 0u64;
        for partition in Partition::ALL {
            let total = model.partition_totals(partition).events;
            let by_category: u64 = model
                .stats()
                .category_map(partition)
                .values()
                .map(|c| c.events)
                .sum();
            prop_assert_eq!(total, by_category);
            per_partition += total;
        }
        prop_assert_eq!(per_partition, model.size() as u64);
    }

    #[test]
    fn prop_statistics_match_events(lines in prop::collection::vec(phase_line(), 0..60)) {
        // Property: each dimension counts exactly the events that carry it
        let model = parse_lines(&lines);
        for kind in EventKind::all() {
            let events: Vec<_> = model.iter().filter(|e| e.kind == kind).collect();
            match model.statistics_for(kind) {
                None => prop_assert!(events.is_empty()),
                Some(stats) => {
                    prop_assert_eq!(stats.events as usize, events.len());
                    let durations = events.iter().filter(|e| e.duration.is_some()).count();
                    prop_assert_eq!(stats.duration.count() as usize, durations);
                    let before = events.iter().filter(|e| e.memory_before_kb.is_some()).count();
                    prop_assert_eq!(stats.memory_before.count() as usize, before);
                    let total = events.iter().filter(|e| e.memory_total_kb.is_some()).count();
                    prop_assert_eq!(stats.memory_total.count() as usize, total);
                }
            }
        }
    }

    #[test]
    fn prop_timestamps_non_decreasing(
        mut lines in prop::collection::vec(phase_line(), 0..60),
    ) {
        // Log lines are time ordered; so are the events built from them
        lines.sort_by_key(|line| uptime_millis(line));
        let model = parse_lines(&lines);
        let timestamps: Vec<f64> = model.iter().filter_map(|e| e.timestamp).collect();
        prop_assert_eq!(timestamps.len(), model.size());
        for pair in timestamps.windows(2) {
            prop_assert!(pair[0] <= pair[1], "{:?}", timestamps);
        }
    }

    #[test]
    fn prop_unit_normalization(value in 0u32..1_000_000) {
        let text = value.to_string();
        prop_assert_eq!(parse_kilobytes(&text, "K"), Some(u64::from(value)));
        prop_assert_eq!(parse_kilobytes(&text, "M"), Some(u64::from(value) * 1024));
        prop_assert_eq!(parse_kilobytes(&text, "G"), Some(u64::from(value) * 1024 * 1024));
        prop_assert_eq!(MemoryUnit::parse("KB").map(|u| u.kb_factor()), Some(1.0));
    }

    #[test]
    fn prop_bucket_invariants(values in prop::collection::vec(-1.0e9f64..1.0e9, 0..100)) {
        let mut bucket = StatBucket::new();
        for &v in &values {
            bucket.observe(v);
        }
        prop_assert_eq!(bucket.count() as usize, values.len());
        match (bucket.min(), bucket.max()) {
            (Some(min), Some(max)) => {
                prop_assert!(min <= max);
                let mean = bucket.mean().unwrap();
                let tolerance = 1e-9 * min.abs().max(max.abs()).max(1.0);
                prop_assert!(mean >= min - tolerance && mean <= max + tolerance);
            }
            (None, None) => prop_assert!(values.is_empty()),
            _ => prop_assert!(false, "min and max must be defined together"),
        }
    }

    #[test]
    fn prop_bucket_merge_matches_sequential(
        left in prop::collection::vec(0.0f64..1.0e6, 0..40),
        right in prop::collection::vec(0.0f64..1.0e6, 0..40),
    ) {
        let mut a = StatBucket::new();
        let mut b = StatBucket::new();
        let mut all = StatBucket::new();
        for &v in &left {
            a.observe(v);
            all.observe(v);
        }
        for &v in &right {
            b.observe(v);
            all.observe(v);
        }
        a.merge(&b);
        prop_assert_eq!(a.count(), all.count());
        prop_assert_eq!(a.min(), all.min());
        prop_assert_eq!(a.max(), all.max());
    }
}
