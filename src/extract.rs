//! Field extraction from the text following a recognized phase name
//!
//! Handles the shapes unified logging prints after a phase name:
//!
//! - `4.812ms` trailing duration
//! - `14M->3M(256M)` before/after/committed heap
//! - `106M(0%)->88M(0%)` ZGC before/after with occupancy
//! - `194560M (100%) ...` a single size (ZGC heap table rows)
//! - `(G1 Evacuation Pause)` leading cause
//!
//! Anything absent stays `None`. A value whose pattern matched but that does
//! not convert to a finite number is also `None` and is counted in
//! [`PartialFields::malformed`].

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::event::{EventKind, LineForm};
use crate::units::{parse_kilobytes, parse_seconds};

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(?P<value>\d+(?:[.,]\d+)?)\s?(?P<unit>ms|us|µs|ns|s)\s*$")
        .expect("duration pattern is valid")
});

static MEMORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<before>\d+(?:\.\d+)?)(?P<before_unit>[KMG]?B|[KMG])(?:\(\d+%\))?",
        r"->",
        r"(?P<after>\d+(?:\.\d+)?)(?P<after_unit>[KMG]?B|[KMG])(?:\(\d+%\))?",
        r"(?:\((?P<total>\d+(?:\.\d+)?)(?P<total_unit>[KMG]?B|[KMG])\))?",
    ))
    .expect("memory pattern is valid")
});

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<value>\d+(?:\.\d+)?)(?P<unit>[KMG]?B|[KMG])\b")
        .expect("size pattern is valid")
});

/// Fields pulled from one line; each may be unknown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialFields {
    /// Seconds
    pub duration: Option<f64>,
    pub memory_before_kb: Option<u64>,
    pub memory_after_kb: Option<u64>,
    pub memory_total_kb: Option<u64>,
    pub cause: Option<String>,
    /// Number of values that matched a pattern but could not be converted
    pub malformed: u32,
}

impl PartialFields {
    pub fn has_memory(&self) -> bool {
        self.memory_before_kb.is_some()
            || self.memory_after_kb.is_some()
            || self.memory_total_kb.is_some()
    }
}

/// True if the text carries a duration or a heap transition
pub fn carries_data(tail: &str) -> bool {
    DURATION_RE.is_match(tail) || MEMORY_RE.is_match(tail)
}

/// True if the text carries a heap transition
pub fn carries_memory(tail: &str) -> bool {
    MEMORY_RE.is_match(tail)
}

/// Extract the fields of a line of `kind` from the text after its phase name
pub fn extract(kind: EventKind, tail: &str) -> PartialFields {
    let mut fields = PartialFields::default();

    if kind.form() == LineForm::Detail {
        if let Some(caps) = SIZE_RE.captures(tail) {
            fields.memory_total_kb = kilobytes(&caps, "value", "unit", &mut fields.malformed);
        }
        return fields;
    }

    fields.cause = leading_cause(tail).map(str::to_string);

    if let Some(caps) = MEMORY_RE.captures(tail) {
        fields.memory_before_kb = kilobytes(&caps, "before", "before_unit", &mut fields.malformed);
        fields.memory_after_kb = kilobytes(&caps, "after", "after_unit", &mut fields.malformed);
        fields.memory_total_kb = kilobytes(&caps, "total", "total_unit", &mut fields.malformed);
    }

    if let Some(caps) = DURATION_RE.captures(tail) {
        fields.duration = parse_seconds(&caps["value"], &caps["unit"]);
        if fields.duration.is_none() {
            fields.malformed += 1;
        }
    }

    fields
}

fn kilobytes(caps: &Captures<'_>, value: &str, unit: &str, malformed: &mut u32) -> Option<u64> {
    let value = caps.name(value)?.as_str();
    let unit = caps.name(unit).map_or("", |m| m.as_str());
    let kb = parse_kilobytes(value, unit);
    if kb.is_none() {
        *malformed += 1;
    }
    kb
}

/// Content of a leading balanced `( ... )` group, unless it is numeric
/// (occupancy percentages, G1 marking timestamps)
fn leading_cause(tail: &str) -> Option<&str> {
    let text = tail.trim_start();
    if !text.starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let cause = text[1..i].trim();
                    let numeric = cause.starts_with(|c: char| c.is_ascii_digit());
                    return (!cause.is_empty() && !numeric).then_some(cause);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value present");
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_zgc_phase_duration_only() {
        let fields = extract(EventKind::ZgcPauseMarkStart, " 1.279ms");
        approx(fields.duration, 0.001279);
        assert!(!fields.has_memory());
        assert_eq!(fields.cause, None);
    }

    #[test]
    fn test_zgc_summary_memory_with_percentages() {
        let fields = extract(EventKind::ZgcGcMetadataGcThreshold, " 106M(0%)->88M(0%)");
        assert_eq!(fields.memory_before_kb, Some(106 * 1024));
        assert_eq!(fields.memory_after_kb, Some(88 * 1024));
        assert_eq!(fields.memory_total_kb, None);
        assert_eq!(fields.duration, None);
    }

    #[test]
    fn test_g1_pause_full_shape() {
        let fields = extract(
            EventKind::G1PauseYoungNormal,
            " (G1 Evacuation Pause) 14M->3M(256M) 4.812ms",
        );
        assert_eq!(fields.cause.as_deref(), Some("G1 Evacuation Pause"));
        assert_eq!(fields.memory_before_kb, Some(14 * 1024));
        assert_eq!(fields.memory_after_kb, Some(3 * 1024));
        assert_eq!(fields.memory_total_kb, Some(256 * 1024));
        approx(fields.duration, 0.004812);
        assert_eq!(fields.malformed, 0);
    }

    #[test]
    fn test_nested_parentheses_in_cause() {
        let fields = extract(EventKind::PauseFull, " (System.gc()) 10M->2M(20M) 12.345ms");
        assert_eq!(fields.cause.as_deref(), Some("System.gc()"));
    }

    #[test]
    fn test_g1_marking_timestamps_are_not_a_cause() {
        let fields = extract(EventKind::G1ConcurrentMark, "0.429s, 0.433s) 3.857ms");
        assert_eq!(fields.cause, None);
        approx(fields.duration, 0.003857);

        let start = extract(EventKind::G1ConcurrentMark, "0.429s)");
        assert_eq!(start.duration, None);
    }

    #[test]
    fn test_capacity_row() {
        let fields = extract(
            EventKind::ZgcHeapCapacity,
            "   194560M (100%)     194560M (100%)     194560M (100%)",
        );
        assert_eq!(fields.memory_total_kb, Some(194560 * 1024));
        assert_eq!(fields.memory_before_kb, None);
        assert_eq!(fields.duration, None);
    }

    #[test]
    fn test_missing_values_stay_unknown() {
        let fields = extract(EventKind::G1PauseRemark, "");
        assert_eq!(fields, PartialFields::default());
    }

    #[test]
    fn test_malformed_memory_is_unknown_and_counted() {
        let tail = format!(" {}G->3M(256M) 1.0ms", "9".repeat(400));
        let fields = extract(EventKind::PauseYoung, &tail);
        assert_eq!(fields.memory_before_kb, None);
        assert_eq!(fields.memory_after_kb, Some(3 * 1024));
        assert_eq!(fields.memory_total_kb, Some(256 * 1024));
        approx(fields.duration, 0.001);
        assert_eq!(fields.malformed, 1);
    }

    #[test]
    fn test_carries_data() {
        assert!(carries_data(" (Allocation Failure) 33M->4M(123M) 4.567ms"));
        assert!(carries_data(" 0.363ms"));
        assert!(!carries_data(" (Allocation Failure)"));
        assert!(!carries_data("0.429s)"));
        assert!(carries_memory(" 106M(0%)->88M(0%)"));
        assert!(!carries_memory(" 1.279ms"));
    }
}
