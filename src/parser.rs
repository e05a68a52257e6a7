//! Parse sessions
//!
//! A [`GcLogParser`] owns one correlator and one model. Lines are fed in file
//! order; `feed` never fails, whatever the input. Lines that carry nothing
//! recognizable are counted and skipped.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::classify::{classify, Classification, LineDecorations};
use crate::config::{ConfigError, ParserConfig};
use crate::correlator::PhaseCorrelator;
use crate::extract::extract;
use crate::model::EventModel;

/// Diagnostics for one parse session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub lines: u64,
    pub recognized: u64,
    pub unrecognized: u64,
    /// Values that matched a field pattern but did not convert
    pub malformed_fields: u64,
    pub dangling_ends: u64,
    pub abandoned_starts: u64,
    pub evicted_starts: u64,
}

#[derive(Debug)]
pub struct GcLogParser {
    correlator: PhaseCorrelator,
    model: EventModel,
    stats: ParseStats,
    /// First wall-clock decoration seen; timestamps of lines without an
    /// uptime decoration are relative to it
    wall_clock_origin: Option<DateTime<FixedOffset>>,
}

impl Default for GcLogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl GcLogParser {
    pub fn new() -> Self {
        Self::from_valid_config(&ParserConfig::default())
    }

    pub fn with_config(config: &ParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: &ParserConfig) -> Self {
        Self {
            correlator: PhaseCorrelator::new(config),
            model: EventModel::new(),
            stats: ParseStats::default(),
            wall_clock_origin: None,
        }
    }

    /// Feed the next line of the log
    pub fn feed(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        self.stats.lines += 1;

        let Classification::Recognized(recognized) = classify(line) else {
            self.stats.unrecognized += 1;
            tracing::trace!("Skipping line {}: {}", self.stats.lines, line);
            return;
        };
        self.stats.recognized += 1;

        let fields = extract(recognized.kind, recognized.tail);
        self.stats.malformed_fields += u64::from(fields.malformed);
        if fields.malformed > 0 {
            tracing::debug!(
                "Line {}: {} malformed value(s) in {}",
                self.stats.lines,
                fields.malformed,
                recognized.kind
            );
        }

        let timestamp = self.resolve_timestamp(&recognized.decorations);
        for event in self.correlator.accept(&recognized, timestamp, fields) {
            self.model.append(event);
        }
    }

    /// Events released so far. A finished event appears once every phase
    /// that started before it has ended, so the model stays in start order.
    pub fn model(&self) -> &EventModel {
        &self.model
    }

    /// Diagnostics so far
    pub fn stats(&self) -> ParseStats {
        let correlator = self.correlator.stats();
        ParseStats {
            dangling_ends: correlator.dangling_ends,
            abandoned_starts: correlator.abandoned_starts,
            evicted_starts: correlator.evicted_starts,
            ..self.stats
        }
    }

    /// Number of operations awaiting their end line
    pub fn open_phases(&self) -> usize {
        self.correlator.open_phases()
    }

    /// Number of finished events not yet in the model
    pub fn held_events(&self) -> usize {
        self.correlator.held_events()
    }

    /// End the session; starts that were never closed are discarded
    pub fn finish(self) -> EventModel {
        self.finish_with_stats().0
    }

    pub fn finish_with_stats(mut self) -> (EventModel, ParseStats) {
        for event in self.correlator.finish() {
            self.model.append(event);
        }
        let stats = self.stats();
        tracing::debug!(
            "Parsed {} lines: {} recognized, {} events, {} dangling ends, {} abandoned starts",
            stats.lines,
            stats.recognized,
            self.model.size(),
            stats.dangling_ends,
            stats.abandoned_starts
        );
        (self.model, stats)
    }

    fn resolve_timestamp(&mut self, decorations: &LineDecorations<'_>) -> Option<f64> {
        if decorations.uptime.is_some() {
            return decorations.uptime;
        }
        let time = decorations.wall_clock?;
        let origin = *self.wall_clock_origin.get_or_insert(time);
        let micros = (time - origin).num_microseconds()?;
        Some(micros as f64 / 1_000_000.0)
    }
}

/// Parse a whole log held in memory
pub fn parse_str(text: &str) -> EventModel {
    parse_lines(text.lines())
}

/// Parse a sequence of lines with the default configuration
pub fn parse_lines<I, S>(lines: I) -> EventModel
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = GcLogParser::new();
    for line in lines {
        parser.feed(line.as_ref());
    }
    parser.finish()
}
