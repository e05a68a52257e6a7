//! Running statistics for GC events
//!
//! Nothing here retains samples: every bucket keeps count, sum, min and max
//! and derives the mean on demand. Each measured dimension (duration and the
//! three heap sizes) has its own bucket, so an event missing one value still
//! contributes to the others.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::event::{EventDescriptor, EventKind, Generation, Partition};

/// Count, sum and extrema of the values observed so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatBucket {
    count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

/// Snapshot of a [`StatBucket`]; everything but `count` is `None` while empty
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSummary {
    pub count: u64,
    pub sum: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl StatBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one value. Non-finite values are not observations.
    pub fn observe(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;
        self.sum += value;
        // Strict comparisons: on ties the first value seen stays
        if self.min.map_or(true, |min| value < min) {
            self.min = Some(value);
        }
        if self.max.map_or(true, |max| value > max) {
            self.max = Some(value);
        }
    }

    /// Record a value if it is known
    pub fn observe_opt(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.observe(value);
        }
    }

    /// Fold another bucket into this one
    pub fn merge(&mut self, other: &StatBucket) {
        if other.count == 0 {
            return;
        }
        self.count += other.count;
        self.sum += other.sum;
        if let Some(other_min) = other.min {
            if self.min.map_or(true, |min| other_min < min) {
                self.min = Some(other_min);
            }
        }
        if let Some(other_max) = other.max {
            if self.max.map_or(true, |max| other_max > max) {
                self.max = Some(other_max);
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn sum(&self) -> Option<f64> {
        (self.count > 0).then_some(self.sum)
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            count: self.count,
            sum: self.sum(),
            min: self.min,
            max: self.max,
            mean: self.mean(),
        }
    }
}

/// Measured quantity of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Seconds
    Duration,
    /// Kilobytes
    MemoryBefore,
    MemoryAfter,
    MemoryTotal,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Duration,
        Dimension::MemoryBefore,
        Dimension::MemoryAfter,
        Dimension::MemoryTotal,
    ];

    pub fn value(self, event: &EventDescriptor) -> Option<f64> {
        match self {
            Self::Duration => event.duration,
            Self::MemoryBefore => event.memory_before_kb.map(|kb| kb as f64),
            Self::MemoryAfter => event.memory_after_kb.map(|kb| kb as f64),
            Self::MemoryTotal => event.memory_total_kb.map(|kb| kb as f64),
        }
    }
}

/// Statistics for one category of events
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    /// Events observed, whatever dimensions they carried
    pub events: u64,
    pub duration: StatBucket,
    pub memory_before: StatBucket,
    pub memory_after: StatBucket,
    pub memory_total: StatBucket,
}

impl CategoryStats {
    pub fn observe(&mut self, event: &EventDescriptor) {
        self.events += 1;
        for dimension in Dimension::ALL {
            self.bucket_mut(dimension).observe_opt(dimension.value(event));
        }
    }

    pub fn bucket(&self, dimension: Dimension) -> &StatBucket {
        match dimension {
            Dimension::Duration => &self.duration,
            Dimension::MemoryBefore => &self.memory_before,
            Dimension::MemoryAfter => &self.memory_after,
            Dimension::MemoryTotal => &self.memory_total,
        }
    }

    fn bucket_mut(&mut self, dimension: Dimension) -> &mut StatBucket {
        match dimension {
            Dimension::Duration => &mut self.duration,
            Dimension::MemoryBefore => &mut self.memory_before,
            Dimension::MemoryAfter => &mut self.memory_after,
            Dimension::MemoryTotal => &mut self.memory_total,
        }
    }

    /// Heap reclaimed on average, in KB (before minus after)
    pub fn mean_reclaimed_kb(&self) -> Option<f64> {
        Some(self.memory_before.mean()? - self.memory_after.mean()?)
    }
}

/// Per-category statistics, partitioned into pause, full pause and concurrent
#[derive(Debug, Clone, Default)]
pub struct StatsTracker {
    categories: [BTreeMap<EventKind, CategoryStats>; 3],
    totals: [CategoryStats; 3],
    generations: BTreeMap<Generation, CategoryStats>,
}

fn slot(partition: Partition) -> usize {
    match partition {
        Partition::Pause => 0,
        Partition::FullPause => 1,
        Partition::Concurrent => 2,
    }
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished event in exactly one partition; returns that partition
    pub fn observe(&mut self, event: &EventDescriptor) -> Partition {
        let partition = event.partition();
        let i = slot(partition);
        self.categories[i]
            .entry(event.kind)
            .or_default()
            .observe(event);
        self.totals[i].observe(event);
        self.generations
            .entry(event.generation)
            .or_default()
            .observe(event);
        partition
    }

    /// Kinds seen so far in `partition`, in taxonomy order
    pub fn categories(&self, partition: Partition) -> impl Iterator<Item = EventKind> + '_ {
        self.categories[slot(partition)].keys().copied()
    }

    pub fn category_map(&self, partition: Partition) -> &BTreeMap<EventKind, CategoryStats> {
        &self.categories[slot(partition)]
    }

    pub fn statistics_for(&self, kind: EventKind) -> Option<&CategoryStats> {
        self.categories[slot(kind.partition())].get(&kind)
    }

    /// All events of a partition folded together
    pub fn partition_totals(&self, partition: Partition) -> &CategoryStats {
        &self.totals[slot(partition)]
    }

    pub fn generation_totals(&self, generation: Generation) -> Option<&CategoryStats> {
        self.generations.get(&generation)
    }
}
