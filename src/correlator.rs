//! Phase correlation: pairing start and end lines into single events
//!
//! Open operations are keyed by phase family and `GC(n)` cycle id, so
//! interleaved cycles (a G1 concurrent cycle spanning several young pauses)
//! never see each other's state.
//!
//! Policy for incomplete input:
//! - an end line without an open start is emitted with its own fields
//! - a start line that is never closed is dropped when the session finishes
//!
//! Events are released in the order their first line appeared. A finished
//! event is held back while any phase that started before it is still open,
//! so a concurrent cycle is reported ahead of the young pauses it spans.
//!
//! Besides start/end pairs the correlator keeps a small per-cycle context fed
//! by detail lines (ZGC heap `Capacity:` rows). A cycle summary event that does
//! not report the heap size itself takes it from that context.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::classify::{RecognizedLine, Role};
use crate::config::{MergeRule, ParserConfig};
use crate::event::{EventDescriptor, EventKind, FinishedEvent, LineForm};
use crate::extract::PartialFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PhaseFamily {
    /// Start and end lines of the same kind
    Kind(EventKind),
    /// Two kinds joined by a configured merge rule (index into the rules)
    Rule(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PhaseKey {
    family: PhaseFamily,
    cycle_id: Option<u64>,
}

#[derive(Debug)]
struct OpenPhase {
    descriptor: EventDescriptor,
    /// Sequence number of the start line; orders release and eviction
    opened: u64,
}

#[derive(Debug, Default)]
struct CycleContext {
    capacity_kb: Option<u64>,
}

/// Counters for input the correlator had to recover from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorrelatorStats {
    /// End lines emitted without a matching start
    pub dangling_ends: u64,
    /// Start lines never closed (or reopened before being closed)
    pub abandoned_starts: u64,
    /// Start lines dropped because too many operations were open or too
    /// many finished events were waiting on them
    pub evicted_starts: u64,
}

/// Stateful start/end pairing for one parse session
#[derive(Debug)]
pub struct PhaseCorrelator {
    merge_rules: Vec<MergeRule>,
    max_open_phases: usize,
    max_held_events: usize,
    open: HashMap<PhaseKey, OpenPhase>,
    cycles: HashMap<u64, CycleContext>,
    /// Finished events waiting for earlier phases, keyed by sequence number
    held: BTreeMap<u64, FinishedEvent>,
    next_seq: u64,
    stats: CorrelatorStats,
}

impl PhaseCorrelator {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            merge_rules: config.merge_rules.clone(),
            max_open_phases: config.max_open_phases.max(1),
            max_held_events: config.max_held_events.max(1),
            open: HashMap::new(),
            cycles: HashMap::new(),
            held: BTreeMap::new(),
            next_seq: 0,
            stats: CorrelatorStats::default(),
        }
    }

    /// Feed one recognized line.
    ///
    /// Returns the events that became ready, oldest first. That is usually
    /// the event this line completes, but can be none (held behind an open
    /// phase) or several (the line closed the phase others were waiting on).
    pub fn accept(
        &mut self,
        line: &RecognizedLine<'_>,
        timestamp: Option<f64>,
        fields: PartialFields,
    ) -> Vec<FinishedEvent> {
        let (role, family, kind) = self.effective_role(line.kind, line.role, line.cycle_id);
        let key = PhaseKey {
            family,
            cycle_id: line.cycle_id,
        };

        match role {
            Role::Detail => {
                self.record_detail(line, &fields);
                return Vec::new();
            }
            Role::Start => {
                let descriptor = EventDescriptor::new(kind, timestamp, line.cycle_id, fields);
                self.open_phase(key, descriptor);
            }
            Role::End => match self.open.remove(&key) {
                Some(open) => {
                    let descriptor = close_phase(open.descriptor, kind, timestamp, fields);
                    self.complete(open.opened, descriptor);
                }
                None => {
                    self.stats.dangling_ends += 1;
                    tracing::debug!(
                        "End of {} (cycle {:?}) without a start line, keeping end fields only",
                        kind,
                        line.cycle_id
                    );
                    let seq = self.next_seq();
                    self.complete(seq, EventDescriptor::new(kind, timestamp, line.cycle_id, fields));
                }
            },
            Role::SelfContained => {
                let seq = self.next_seq();
                self.complete(seq, EventDescriptor::new(kind, timestamp, line.cycle_id, fields));
            }
        }
        self.release()
    }

    /// Number of operations currently awaiting their end line
    pub fn open_phases(&self) -> usize {
        self.open.len()
    }

    /// Number of finished events waiting for an earlier phase to close
    pub fn held_events(&self) -> usize {
        self.held.len()
    }

    pub fn stats(&self) -> CorrelatorStats {
        self.stats
    }

    /// End of input: drop every operation still open and release the events
    /// that were waiting on them
    pub fn finish(&mut self) -> Vec<FinishedEvent> {
        for open in self.open.values() {
            tracing::debug!(
                "Discarding unclosed {} (cycle {:?}) at end of input",
                open.descriptor.kind,
                open.descriptor.cycle_id
            );
        }
        self.stats.abandoned_starts += self.open.len() as u64;
        self.open.clear();
        self.cycles.clear();
        self.release()
    }

    /// Merge rules turn self-contained kinds into start/end pairs, and a
    /// self-contained line closes the phase it would have opened without data
    fn effective_role(
        &self,
        kind: EventKind,
        role: Role,
        cycle_id: Option<u64>,
    ) -> (Role, PhaseFamily, EventKind) {
        if role == Role::SelfContained {
            if let Some(opened) = kind.info().opens {
                let key = PhaseKey {
                    family: PhaseFamily::Kind(opened),
                    cycle_id,
                };
                if self.open.contains_key(&key) {
                    return (Role::End, PhaseFamily::Kind(opened), opened);
                }
            }
            for (i, rule) in self.merge_rules.iter().enumerate() {
                if rule.end == kind {
                    return (Role::End, PhaseFamily::Rule(i), kind);
                }
                if rule.start == kind {
                    return (Role::Start, PhaseFamily::Rule(i), kind);
                }
            }
        }
        (role, PhaseFamily::Kind(kind), kind)
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn open_phase(&mut self, key: PhaseKey, descriptor: EventDescriptor) {
        let opened = self.next_seq();

        if let Some(previous) = self.open.insert(key, OpenPhase { descriptor, opened }) {
            self.stats.abandoned_starts += 1;
            tracing::debug!(
                "{} (cycle {:?}) started again before it ended, dropping the earlier start",
                previous.descriptor.kind,
                previous.descriptor.cycle_id
            );
        }

        if self.open.len() > self.max_open_phases {
            self.evict_oldest("open phases", self.max_open_phases);
        }
    }

    fn evict_oldest(&mut self, what: &str, limit: usize) {
        let oldest = self
            .open
            .iter()
            .min_by_key(|(_, phase)| phase.opened)
            .map(|(key, _)| *key);
        if let Some(evicted) = oldest.and_then(|key| self.open.remove(&key)) {
            self.stats.evicted_starts += 1;
            tracing::debug!(
                "More than {} {}, evicting {} (cycle {:?})",
                limit,
                what,
                evicted.descriptor.kind,
                evicted.descriptor.cycle_id
            );
        }
    }

    fn record_detail(&mut self, line: &RecognizedLine<'_>, fields: &PartialFields) {
        let Some(cycle_id) = line.cycle_id else {
            return;
        };
        let context = self.cycles.entry(cycle_id).or_default();
        if fields.memory_total_kb.is_some() {
            context.capacity_kb = fields.memory_total_kb;
        }

        if self.cycles.len() > self.max_open_phases {
            // Cycle ids grow monotonically; the smallest one is the stalest
            if let Some(&stale) = self.cycles.keys().min() {
                self.cycles.remove(&stale);
            }
        }
    }

    fn complete(&mut self, seq: u64, mut descriptor: EventDescriptor) {
        if descriptor.kind.form() == LineForm::CycleSummary {
            let context = descriptor.cycle_id.and_then(|id| self.cycles.remove(&id));
            if descriptor.memory_total_kb.is_none() {
                descriptor.memory_total_kb = context.and_then(|c| c.capacity_kb);
            }
        }
        self.held.insert(seq, FinishedEvent::new(descriptor));

        // A phase that never closes would otherwise hold every later event
        while self.held.len() > self.max_held_events {
            let first = self.held.keys().next().copied();
            match (self.barrier(), first) {
                (Some(barrier), Some(first)) if first > barrier => {
                    self.evict_oldest("held events", self.max_held_events)
                }
                _ => break,
            }
        }
    }

    /// Sequence number of the oldest open phase
    fn barrier(&self) -> Option<u64> {
        self.open.values().map(|phase| phase.opened).min()
    }

    /// Pop every held event that no open phase precedes
    fn release(&mut self) -> Vec<FinishedEvent> {
        let barrier = self.barrier();
        let mut ready = Vec::new();
        while let Some(entry) = self.held.first_entry() {
            if barrier.is_some_and(|barrier| *entry.key() > barrier) {
                break;
            }
            ready.push(entry.remove());
        }
        ready
    }
}

/// Fold an end line into the descriptor opened by its start line.
///
/// The start's timestamp is kept. Duration is the end line's own value, or the
/// time elapsed between the two lines when the end does not report one.
fn close_phase(
    mut descriptor: EventDescriptor,
    end_kind: EventKind,
    end_timestamp: Option<f64>,
    fields: PartialFields,
) -> EventDescriptor {
    descriptor.retype(end_kind);
    descriptor.duration = fields.duration.or_else(|| match (descriptor.timestamp, end_timestamp) {
        (Some(start), Some(end)) if end >= start => Some(end - start),
        _ => None,
    });
    descriptor.memory_before_kb = fields.memory_before_kb.or(descriptor.memory_before_kb);
    descriptor.memory_after_kb = fields.memory_after_kb.or(descriptor.memory_after_kb);
    descriptor.memory_total_kb = fields.memory_total_kb.or(descriptor.memory_total_kb);
    if descriptor.cause.is_none() {
        descriptor.cause = fields.cause;
    }
    descriptor
}
