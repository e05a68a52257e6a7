//! Parse session configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! max_open_phases = 1024
//! max_held_events = 4096
//!
//! [[merge_rules]]
//! start = "zgc_pause_mark_start"
//! end = "zgc_pause_mark_end"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::event::{EventKind, LineForm, UnknownEventKind};

/// Errors loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid merge rule {start}={end}: {reason}")]
    InvalidRule {
        start: String,
        end: String,
        reason: String,
    },

    #[error("Invalid merge rule '{spec}': {reason}")]
    InvalidRuleSpec { spec: String, reason: String },

    #[error("max_open_phases must be at least 1")]
    NoOpenPhases,

    #[error("max_held_events must be at least 1")]
    NoHeldEvents,
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Joins two otherwise independent line kinds into one start/end pair.
///
/// The merged event has the `end` kind, the start line's timestamp and the end
/// line's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRule {
    pub start: EventKind,
    pub end: EventKind,
}

impl MergeRule {
    /// Parse `START=END` using event kind names
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| ConfigError::InvalidRuleSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };
        let (start, end) = spec
            .split_once('=')
            .ok_or_else(|| invalid("expected START=END"))?;
        let start = start.parse().map_err(|e: UnknownEventKind| invalid(&e.to_string()))?;
        let end = end.parse().map_err(|e: UnknownEventKind| invalid(&e.to_string()))?;
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Start/end pairings beyond the ones implied by the line shapes
    pub merge_rules: Vec<MergeRule>,

    /// Upper bound on operations awaiting their end line. Truncated or
    /// corrupted logs would otherwise grow the open set without limit.
    pub max_open_phases: usize,

    /// Upper bound on finished events waiting for an earlier phase to close.
    /// Past it the oldest open phase is evicted.
    pub max_held_events: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            merge_rules: Vec::new(),
            max_open_phases: 1024,
            max_held_events: 4096,
        }
    }
}

impl ParserConfig {
    /// ZGC mark start/end reported as a single pause
    pub fn merged_zgc_marks() -> Self {
        Self {
            merge_rules: vec![MergeRule {
                start: EventKind::ZgcPauseMarkStart,
                end: EventKind::ZgcPauseMarkEnd,
            }],
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Each kind may take part in at most one rule, and only kinds that
    /// complete on a single line can be merged
    pub fn validate(&self) -> Result<()> {
        if self.max_open_phases == 0 {
            return Err(ConfigError::NoOpenPhases);
        }
        if self.max_held_events == 0 {
            return Err(ConfigError::NoHeldEvents);
        }

        let mut seen = HashSet::new();
        for rule in &self.merge_rules {
            let invalid = |reason: String| ConfigError::InvalidRule {
                start: rule.start.name().to_string(),
                end: rule.end.name().to_string(),
                reason,
            };
            if rule.start == rule.end {
                return Err(invalid("start and end are the same kind".to_string()));
            }
            for kind in [rule.start, rule.end] {
                if kind.form() != LineForm::SelfContained {
                    return Err(invalid(format!("{} is not a single-line phase", kind.name())));
                }
                if !seen.insert(kind) {
                    return Err(invalid(format!("{} is used by another rule", kind.name())));
                }
            }
        }
        Ok(())
    }
}
