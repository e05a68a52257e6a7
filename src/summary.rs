//! Serializable snapshot of an event model
//!
//! Used by the command line for `--format text` and `--format json`.

use serde::Serialize;
use std::fmt;

use crate::event::{EventKind, FinishedEvent, Generation, Partition};
use crate::model::EventModel;
use crate::parser::ParseStats;
use crate::stats::{CategoryStats, StatsSummary};

/// JSON format identifier
pub const FORMAT: &str = "gclens-summary-v1";

/// Statistics of one category, or of a whole partition when `kind` is `None`
#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    pub label: String,
    pub events: u64,
    /// Seconds
    pub duration: StatsSummary,
    pub memory_before_kb: StatsSummary,
    pub memory_after_kb: StatsSummary,
    pub memory_total_kb: StatsSummary,
    /// Mean heap reclaimed per event (mean before minus mean after)
    pub mean_reclaimed_kb: Option<f64>,
}

impl CategorySummary {
    fn new(kind: Option<EventKind>, label: String, stats: &CategoryStats) -> Self {
        Self {
            kind,
            label,
            events: stats.events,
            duration: stats.duration.summary(),
            memory_before_kb: stats.memory_before.summary(),
            memory_after_kb: stats.memory_after.summary(),
            memory_total_kb: stats.memory_total.summary(),
            mean_reclaimed_kb: stats.mean_reclaimed_kb(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionSummary {
    pub partition: Partition,
    pub total: CategorySummary,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub generation: Generation,
    pub total: CategorySummary,
}

/// Root output structure
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub version: String,
    pub format: String,
    pub event_count: usize,
    pub partitions: Vec<PartitionSummary>,
    pub generations: Vec<GenerationSummary>,
    pub diagnostics: ParseStats,
    /// Every event in start order (only with `--events`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<FinishedEvent>>,
}

impl ModelSummary {
    pub fn new(model: &EventModel, diagnostics: ParseStats) -> Self {
        let stats = model.stats();
        let partitions = Partition::ALL
            .into_iter()
            .map(|partition| PartitionSummary {
                partition,
                total: CategorySummary::new(
                    None,
                    partition.to_string(),
                    stats.partition_totals(partition),
                ),
                categories: stats
                    .category_map(partition)
                    .iter()
                    .map(|(kind, category)| {
                        CategorySummary::new(Some(*kind), kind.label().to_string(), category)
                    })
                    .collect(),
            })
            .collect();

        let generations = [Generation::Young, Generation::Old, Generation::All]
            .into_iter()
            .filter_map(|generation| {
                let totals = stats.generation_totals(generation)?;
                Some(GenerationSummary {
                    generation,
                    total: CategorySummary::new(None, generation.to_string(), totals),
                })
            })
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: FORMAT.to_string(),
            event_count: model.size(),
            partitions,
            generations,
            diagnostics,
            events: None,
        }
    }

    /// Include the full event list
    pub fn with_events(mut self, model: &EventModel) -> Self {
        self.events = Some(model.events().to_vec());
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

fn millis(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |s| format!("{:.3}", s * 1000.0))
}

fn kilobytes(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |kb| format!("{:.0}", kb))
}

fn write_row(f: &mut fmt::Formatter<'_>, row: &CategorySummary, name: &str) -> fmt::Result {
    writeln!(
        f,
        "{:>7} {:>11} {:>11} {:>11} {:>12} {:>12} {:>12} {}",
        row.events,
        millis(row.duration.sum),
        millis(row.duration.mean),
        millis(row.duration.max),
        kilobytes(row.memory_before_kb.mean),
        kilobytes(row.memory_after_kb.mean),
        kilobytes(row.mean_reclaimed_kb),
        name
    )
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.event_count == 0 {
            writeln!(f, "No GC events found.")?;
        }

        for partition in &self.partitions {
            if partition.categories.is_empty() {
                continue;
            }
            writeln!(f, "{} events", partition.partition)?;
            writeln!(
                f,
                "  count    total ms     mean ms      max ms    before KB     after KB reclaimed KB category"
            )?;
            writeln!(
                f,
                "------- ----------- ----------- ----------- ------------ ------------ ------------ ----------------"
            )?;
            for category in &partition.categories {
                write_row(f, category, &category.label)?;
            }
            writeln!(
                f,
                "------- ----------- ----------- ----------- ------------ ------------ ------------ ----------------"
            )?;
            write_row(f, &partition.total, "total")?;
            writeln!(f)?;
        }

        if let Some(events) = &self.events {
            writeln!(f, "Events")?;
            for event in events {
                writeln!(
                    f,
                    "{:>10} {:>8} {:>11} {} {}",
                    event.timestamp.map_or_else(|| "-".to_string(), |t| format!("{:.3}s", t)),
                    event.cycle_id.map_or_else(|| "-".to_string(), |id| format!("GC({})", id)),
                    millis(event.duration),
                    event.label,
                    event.cause.as_deref().map_or_else(String::new, |c| format!("({})", c)),
                )?;
            }
            writeln!(f)?;
        }

        let d = &self.diagnostics;
        writeln!(
            f,
            "{} events from {} lines ({} recognized, {} skipped)",
            self.event_count, d.lines, d.recognized, d.unrecognized
        )?;
        if d.dangling_ends + d.abandoned_starts + d.evicted_starts + d.malformed_fields > 0 {
            writeln!(
                f,
                "{} dangling ends, {} abandoned starts, {} evicted starts, {} malformed values",
                d.dangling_ends, d.abandoned_starts, d.evicted_starts, d.malformed_fields
            )?;
        }
        Ok(())
    }
}
