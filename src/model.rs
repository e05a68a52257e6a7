//! Append-only event model
//!
//! Holds finished events in the order they started together with the running
//! statistics for every category seen so far. The model can be read at any
//! point of a parse session; it only ever grows.

use serde::Serialize;
use thiserror::Error;

use crate::event::{EventKind, FinishedEvent, Generation, Partition};
use crate::stats::{CategoryStats, StatsTracker};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelError {
    #[error("Event index {index} out of range (model holds {size} events)")]
    IndexOutOfRange { index: usize, size: usize },
}

/// Result type for model queries
pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventModel {
    events: Vec<FinishedEvent>,
    #[serde(skip)]
    stats: StatsTracker,
}

impl EventModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished event and update statistics; returns its index
    pub fn append(&mut self, event: FinishedEvent) -> usize {
        self.stats.observe(&event);
        self.events.push(event);
        self.events.len() - 1
    }

    pub fn size(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&FinishedEvent> {
        self.events.get(index).ok_or(ModelError::IndexOutOfRange {
            index,
            size: self.events.len(),
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FinishedEvent> {
        self.events.iter()
    }

    pub fn events(&self) -> &[FinishedEvent] {
        &self.events
    }

    pub fn pause_event_categories(&self) -> Vec<EventKind> {
        self.stats.categories(Partition::Pause).collect()
    }

    pub fn full_gc_event_categories(&self) -> Vec<EventKind> {
        self.stats.categories(Partition::FullPause).collect()
    }

    pub fn concurrent_event_categories(&self) -> Vec<EventKind> {
        self.stats.categories(Partition::Concurrent).collect()
    }

    pub fn statistics_for(&self, kind: EventKind) -> Option<&CategoryStats> {
        self.stats.statistics_for(kind)
    }

    pub fn partition_totals(&self, partition: Partition) -> &CategoryStats {
        self.stats.partition_totals(partition)
    }

    pub fn generation_totals(&self, generation: Generation) -> Option<&CategoryStats> {
        self.stats.generation_totals(generation)
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }
}

impl<'a> IntoIterator for &'a EventModel {
    type Item = &'a FinishedEvent;
    type IntoIter = std::slice::Iter<'a, FinishedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventDescriptor;
    use crate::extract::PartialFields;

    fn finished(kind: EventKind, timestamp: f64, duration: Option<f64>) -> FinishedEvent {
        FinishedEvent::new(EventDescriptor::new(
            kind,
            Some(timestamp),
            Some(0),
            PartialFields {
                duration,
                ..PartialFields::default()
            },
        ))
    }

    #[test]
    fn test_empty_model() {
        let model = EventModel::new();
        assert_eq!(model.size(), 0);
        assert!(model.is_empty());
        assert!(model.pause_event_categories().is_empty());
        assert!(model.full_gc_event_categories().is_empty());
        assert!(model.concurrent_event_categories().is_empty());
        assert_eq!(model.partition_totals(Partition::Pause).events, 0);
    }

    #[test]
    fn test_append_returns_index_and_keeps_order() {
        let mut model = EventModel::new();
        assert_eq!(model.append(finished(EventKind::ZgcPauseMarkStart, 1.0, Some(0.001))), 0);
        assert_eq!(model.append(finished(EventKind::ZgcConcurrentMark, 1.1, Some(0.005))), 1);
        assert_eq!(model.size(), 2);
        assert_eq!(model.get(1).unwrap().kind, EventKind::ZgcConcurrentMark);
        let kinds: Vec<_> = model.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::ZgcPauseMarkStart, EventKind::ZgcConcurrentMark]);
    }

    #[test]
    fn test_get_out_of_range() {
        let mut model = EventModel::new();
        model.append(finished(EventKind::PauseYoung, 1.0, None));
        assert_eq!(
            model.get(1).unwrap_err(),
            ModelError::IndexOutOfRange { index: 1, size: 1 }
        );
        assert_eq!(
            model.get(1).unwrap_err().to_string(),
            "Event index 1 out of range (model holds 1 events)"
        );
    }

    #[test]
    fn test_category_sets_follow_partitions() {
        let mut model = EventModel::new();
        model.append(finished(EventKind::G1PauseYoungNormal, 1.0, Some(0.004)));
        model.append(finished(EventKind::PauseFull, 2.0, Some(0.100)));
        model.append(finished(EventKind::G1ConcurrentMark, 3.0, Some(0.050)));
        model.append(finished(EventKind::G1PauseYoungNormal, 4.0, Some(0.002)));

        assert_eq!(model.pause_event_categories(), vec![EventKind::G1PauseYoungNormal]);
        assert_eq!(model.full_gc_event_categories(), vec![EventKind::PauseFull]);
        assert_eq!(model.concurrent_event_categories(), vec![EventKind::G1ConcurrentMark]);

        let young = model.statistics_for(EventKind::G1PauseYoungNormal).unwrap();
        assert_eq!(young.events, 2);
        assert_eq!(young.duration.max(), Some(0.004));
        assert_eq!(young.duration.min(), Some(0.002));
        assert_eq!(model.generation_totals(Generation::Old).unwrap().events, 1);
    }

    #[test]
    fn test_model_serializes_events() {
        let mut model = EventModel::new();
        model.append(finished(EventKind::ZgcConcurrentRelocate, 1.5, Some(0.002846)));
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["events"][0]["kind"], "zgc_concurrent_relocate");
        assert_eq!(json["events"][0]["label"], "Concurrent Relocate");
        assert_eq!(json["events"][0]["memory_before_kb"], serde_json::Value::Null);
    }
}
