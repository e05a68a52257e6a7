//! Line classification for unified JVM logging output
//!
//! A unified logging line looks like
//!
//! ```text
//! [0.999s][info][gc,phases   ] GC(0) Pause Mark Start 1.279ms
//! ```
//!
//! i.e. zero or more `[...]` decorations, an optional `GC(n)` cycle id and the
//! message. Classification strips the decorations, then matches the message
//! against the phase table built from [`KINDS`]. It is pure: the same line
//! always yields the same result and nothing is recorded anywhere.

use chrono::{DateTime, FixedOffset};
use std::sync::LazyLock;

use crate::event::{EventKind, LineForm, KINDS};
use crate::extract::{carries_data, carries_memory};

/// Decorations found in the leading `[...]` groups of a line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineDecorations<'a> {
    /// Seconds since JVM start (`uptime`, `uptimemillis`, `uptimenanos`)
    pub uptime: Option<f64>,
    /// Wall-clock time (`time`, `utctime`)
    pub wall_clock: Option<DateTime<FixedOffset>>,
    pub level: Option<&'a str>,
    pub tags: Option<&'a str>,
}

/// What a recognized line contributes to its logical operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Opens an operation that a later line closes
    Start,
    /// Closes an operation opened earlier
    End,
    /// Complete event on its own
    SelfContained,
    /// Adds fields to the enclosing cycle
    Detail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine<'a> {
    pub kind: EventKind,
    pub role: Role,
    pub cycle_id: Option<u64>,
    pub decorations: LineDecorations<'a>,
    /// Message text after the phase name
    pub tail: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification<'a> {
    /// No GC-relevant content
    Unrecognized,
    Recognized(RecognizedLine<'a>),
}

impl<'a> Classification<'a> {
    pub fn is_recognized(&self) -> bool {
        matches!(self, Self::Recognized(_))
    }

    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::Recognized(line) => Some(line.kind),
            Self::Unrecognized => None,
        }
    }

    fn has_role(&self, role: Role) -> bool {
        matches!(self, Self::Recognized(line) if line.role == role)
    }

    pub fn is_start(&self) -> bool {
        self.has_role(Role::Start)
    }

    pub fn is_end(&self) -> bool {
        self.has_role(Role::End)
    }

    pub fn is_self_contained(&self) -> bool {
        self.has_role(Role::SelfContained)
    }

    pub fn is_detail(&self) -> bool {
        self.has_role(Role::Detail)
    }
}

struct PhasePattern {
    phase: &'static str,
    kind: EventKind,
}

/// Phase table, longest phase text first so that e.g. `Concurrent Mark Free`
/// wins over `Concurrent Mark`. Built once, read-only afterwards.
static PHASE_TABLE: LazyLock<Vec<PhasePattern>> = LazyLock::new(|| {
    let mut table: Vec<PhasePattern> = KINDS
        .iter()
        .map(|info| PhasePattern {
            phase: info.phase,
            kind: info.kind,
        })
        .collect();
    table.sort_by(|a, b| b.phase.len().cmp(&a.phase.len()));
    table
});

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warning", "error"];

/// Classify one line of log text
pub fn classify(line: &str) -> Classification<'_> {
    let (decorations, message) = split_decorations(line);
    let (cycle_id, body) = split_cycle_id(message);

    let Some((mut kind, tail)) = match_phase(body) else {
        return Classification::Unrecognized;
    };

    let role = match kind.form() {
        LineForm::SelfContained => match kind.info().opens {
            Some(opened) if !carries_data(tail) => {
                kind = opened;
                Role::Start
            }
            _ => Role::SelfContained,
        },
        LineForm::Paired if carries_data(tail) => Role::End,
        LineForm::Paired => Role::Start,
        LineForm::CycleSummary if carries_memory(tail) => Role::SelfContained,
        LineForm::CycleSummary | LineForm::Detail => Role::Detail,
    };

    Classification::Recognized(RecognizedLine {
        kind,
        role,
        cycle_id,
        decorations,
        tail: tail.trim_end(),
    })
}

/// Split leading `[...]` decorations from the message
pub fn split_decorations(line: &str) -> (LineDecorations<'_>, &str) {
    let mut decorations = LineDecorations::default();
    let mut rest = line.trim_start();

    while let Some(open) = rest.strip_prefix('[') {
        let Some(close) = open.find(']') else {
            break;
        };
        let inner = open[..close].trim();
        rest = open[close + 1..].trim_start();
        apply_decoration(&mut decorations, inner);
    }

    (decorations, rest)
}

fn apply_decoration<'a>(decorations: &mut LineDecorations<'a>, inner: &'a str) {
    if decorations.uptime.is_none() {
        if let Some(uptime) = parse_uptime(inner) {
            decorations.uptime = Some(uptime);
            return;
        }
    }
    if LEVELS.contains(&inner) {
        decorations.level = Some(inner);
        return;
    }
    if decorations.wall_clock.is_none() {
        if let Ok(time) = DateTime::parse_from_str(inner, "%Y-%m-%dT%H:%M:%S%.f%z") {
            decorations.wall_clock = Some(time);
            return;
        }
    }
    if decorations.tags.is_none() && inner.starts_with(|c: char| c.is_ascii_alphabetic()) {
        decorations.tags = Some(inner);
    }
}

fn parse_uptime(text: &str) -> Option<f64> {
    let (number, divisor) = if let Some(n) = text.strip_suffix("ms") {
        (n, 1_000.0)
    } else if let Some(n) = text.strip_suffix("ns") {
        (n, 1_000_000_000.0)
    } else if let Some(n) = text.strip_suffix('s') {
        (n, 1.0)
    } else {
        return None;
    };
    if !number.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let value: f64 = number.replace(',', ".").parse().ok()?;
    let seconds = value / divisor;
    seconds.is_finite().then_some(seconds)
}

fn split_cycle_id(message: &str) -> (Option<u64>, &str) {
    if let Some(rest) = message.strip_prefix("GC(") {
        if let Some(end) = rest.find(')') {
            if let Ok(id) = rest[..end].parse() {
                return (Some(id), rest[end + 1..].trim_start());
            }
        }
    }
    (None, message)
}

fn match_phase(body: &str) -> Option<(EventKind, &str)> {
    PHASE_TABLE.iter().find_map(|pattern| {
        let rest = body.strip_prefix(pattern.phase)?;
        let open_ended = pattern.phase.ends_with(['(', ':']);
        let at_boundary = rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '(');
        (open_ended || at_boundary).then_some((pattern.kind, rest))
    })
}
