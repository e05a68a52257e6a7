//! Unit tables for memory sizes and durations found in GC log lines
//!
//! Memory is normalized to kilobytes (1 K = 1024 bytes), durations to seconds.

/// Memory unit suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUnit {
    Bytes,
    Kilo,
    Mega,
    Giga,
}

impl MemoryUnit {
    /// Parse a unit suffix: `B`, `K`/`KB`, `M`/`MB`, `G`/`GB` (case-insensitive)
    pub fn parse(suffix: &str) -> Option<Self> {
        match suffix.to_ascii_uppercase().as_str() {
            "B" => Some(Self::Bytes),
            "K" | "KB" => Some(Self::Kilo),
            "M" | "MB" => Some(Self::Mega),
            "G" | "GB" => Some(Self::Giga),
            _ => None,
        }
    }

    /// Kilobytes per one unit
    pub fn kb_factor(self) -> f64 {
        match self {
            Self::Bytes => 1.0 / 1024.0,
            Self::Kilo => 1.0,
            Self::Mega => 1024.0,
            Self::Giga => 1024.0 * 1024.0,
        }
    }
}

/// Convert `value` in `unit` to whole kilobytes, rounding to nearest.
///
/// Returns `None` for negative, non-finite or out-of-range values.
pub fn to_kilobytes(value: f64, unit: MemoryUnit) -> Option<u64> {
    let kb = match unit {
        // Divide rather than multiply by 1/1024 so large byte counts stay exact
        MemoryUnit::Bytes => value / 1024.0,
        _ => value * unit.kb_factor(),
    };
    if !kb.is_finite() || kb < 0.0 || kb >= u64::MAX as f64 {
        return None;
    }
    Some(kb.round() as u64)
}

/// Parse a numeric literal and unit suffix into kilobytes
pub fn parse_kilobytes(value: &str, suffix: &str) -> Option<u64> {
    let unit = MemoryUnit::parse(suffix)?;
    let value: f64 = value.parse().ok()?;
    to_kilobytes(value, unit)
}

/// Duration unit suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Seconds,
    Millis,
    Micros,
    Nanos,
}

impl DurationUnit {
    pub fn parse(suffix: &str) -> Option<Self> {
        match suffix {
            "s" => Some(Self::Seconds),
            "ms" => Some(Self::Millis),
            "us" | "µs" => Some(Self::Micros),
            "ns" => Some(Self::Nanos),
            _ => None,
        }
    }

    pub fn divisor(self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Millis => 1_000.0,
            Self::Micros => 1_000_000.0,
            Self::Nanos => 1_000_000_000.0,
        }
    }
}

/// Parse a numeric literal and unit suffix into seconds
pub fn parse_seconds(value: &str, suffix: &str) -> Option<f64> {
    let unit = DurationUnit::parse(suffix)?;
    // Some locales print a decimal comma
    let value: f64 = value.replace(',', ".").parse().ok()?;
    let seconds = value / unit.divisor();
    (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
}
