//! GC event taxonomy and event records
//!
//! Every recognized phase maps to one member of the closed [`EventKind`]
//! enumeration. The per-kind attributes (label, phase text matched in the log,
//! generation, pause flag, line form) live in a single static table, [`KINDS`],
//! indexed by the enum discriminant. Supporting a new line shape means adding a
//! variant and a table row.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::extract::PartialFields;

/// Logical heap partition a phase applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    Young,
    Old,
    /// Collectors without generational partitioning, and full collections
    All,
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Young => write!(f, "young"),
            Self::Old => write!(f, "old"),
            Self::All => write!(f, "all"),
        }
    }
}

/// How lines of a kind relate to logical events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineForm {
    /// One line is one complete event (ZGC phase lines)
    SelfContained,
    /// A bare line opens the phase, the same phase with data closes it
    Paired,
    /// With memory data the line is a complete cycle summary; without it the
    /// line only opens the cycle context
    CycleSummary,
    /// Contributes fields to the enclosing cycle, never an event by itself
    Detail,
}

/// The three disjoint statistics partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Stop-the-world pause of part of the heap
    Pause,
    /// Stop-the-world pause collecting the entire heap
    FullPause,
    /// Phase running alongside the mutator
    Concurrent,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Pause, Partition::FullPause, Partition::Concurrent];
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause => write!(f, "pause"),
            Self::FullPause => write!(f, "full pause"),
            Self::Concurrent => write!(f, "concurrent"),
        }
    }
}

/// Every phase the classifier can recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum EventKind {
    // ZGC
    ZgcPauseMarkStart,
    ZgcPauseMarkEnd,
    ZgcPauseRelocateStart,
    ZgcConcurrentMark,
    ZgcConcurrentMarkFree,
    ZgcConcurrentMarkContinue,
    ZgcConcurrentNonRef,
    ZgcConcurrentResetRelocSet,
    ZgcConcurrentDetachedPages,
    ZgcConcurrentSelectRelocSet,
    ZgcConcurrentPrepareRelocSet,
    ZgcConcurrentRelocate,
    ZgcGcMetadataGcThreshold,
    ZgcGcWarmup,
    ZgcGcProactive,
    ZgcGcAllocationRate,
    ZgcGcSystemGc,
    ZgcGcAllocationStall,
    ZgcGcHighUsage,
    ZgcGcTimer,
    ZgcHeapCapacity,
    // G1
    G1PauseYoungNormal,
    G1PauseYoungConcurrentStart,
    G1PauseYoungInitialMark,
    G1PauseYoungPrepareMixed,
    G1PauseYoungMixed,
    G1PauseRemark,
    G1PauseCleanup,
    G1ConcurrentCycle,
    G1ConcurrentMarkCycle,
    G1ConcurrentClearClaimedMarks,
    G1ConcurrentScanRootRegions,
    G1ConcurrentMark,
    G1ConcurrentMarkFromRoots,
    G1ConcurrentPreclean,
    G1ConcurrentRebuildRemSets,
    G1ConcurrentCleanupForNextMark,
    // Serial, Parallel (and G1 full collections)
    PauseYoung,
    PauseFull,
    // Shenandoah
    ShenPauseInitMark,
    ShenPauseFinalMark,
    ShenPauseInitUpdateRefs,
    ShenPauseFinalUpdateRefs,
    ShenPauseDegenerated,
    ShenConcurrentReset,
    ShenConcurrentMarking,
    ShenConcurrentCleanup,
    ShenConcurrentEvacuation,
    ShenConcurrentUpdateRefs,
}

/// Static attributes of one [`EventKind`]
#[derive(Debug, Clone, Copy)]
pub struct KindInfo {
    pub kind: EventKind,
    /// Stable identifier used in configuration files and on the command line
    pub name: &'static str,
    /// Human-readable label
    pub label: &'static str,
    /// Text the message body starts with (after the `GC(n)` prefix)
    pub phase: &'static str,
    pub generation: Generation,
    pub is_pause: bool,
    pub form: LineForm,
    /// Cause that is part of the phase text itself
    pub cause: Option<&'static str>,
    /// Kind whose phase a bare line (no trailing data) opens instead. The
    /// data-carrying line then closes that phase when it is open.
    pub opens: Option<EventKind>,
}

const fn info(
    kind: EventKind,
    name: &'static str,
    label: &'static str,
    phase: &'static str,
    generation: Generation,
    is_pause: bool,
    form: LineForm,
) -> KindInfo {
    KindInfo {
        kind,
        name,
        label,
        phase,
        generation,
        is_pause,
        form,
        cause: None,
        opens: None,
    }
}

const fn zgc_cycle(
    kind: EventKind,
    name: &'static str,
    label: &'static str,
    cause: &'static str,
) -> KindInfo {
    KindInfo {
        kind,
        name,
        label,
        phase: label,
        generation: Generation::All,
        is_pause: true,
        form: LineForm::CycleSummary,
        cause: Some(cause),
        opens: None,
    }
}

use EventKind as K;
use Generation::{All, Old, Young};
use LineForm::{Detail, Paired, SelfContained};

/// Kind attribute table, indexed by `EventKind as usize`
pub static KINDS: [KindInfo; 49] = [
    // ZGC phases: one line each, duration included
    info(K::ZgcPauseMarkStart, "zgc_pause_mark_start", "Pause Mark Start", "Pause Mark Start", All, true, SelfContained),
    info(K::ZgcPauseMarkEnd, "zgc_pause_mark_end", "Pause Mark End", "Pause Mark End", All, true, SelfContained),
    info(K::ZgcPauseRelocateStart, "zgc_pause_relocate_start", "Pause Relocate Start", "Pause Relocate Start", All, true, SelfContained),
    // JDK 12+ G1 prints the same text for its concurrent mark start and end
    KindInfo {
        opens: Some(K::G1ConcurrentMark),
        ..info(K::ZgcConcurrentMark, "zgc_concurrent_mark", "Concurrent Mark", "Concurrent Mark", All, false, SelfContained)
    },
    info(K::ZgcConcurrentMarkFree, "zgc_concurrent_mark_free", "Concurrent Mark Free", "Concurrent Mark Free", All, false, SelfContained),
    info(K::ZgcConcurrentMarkContinue, "zgc_concurrent_mark_continue", "Concurrent Mark Continue", "Concurrent Mark Continue", All, false, SelfContained),
    info(K::ZgcConcurrentNonRef, "zgc_concurrent_non_ref", "Concurrent Process Non-Strong References", "Concurrent Process Non-Strong References", All, false, SelfContained),
    info(K::ZgcConcurrentResetRelocSet, "zgc_concurrent_reset_reloc_set", "Concurrent Reset Relocation Set", "Concurrent Reset Relocation Set", All, false, SelfContained),
    info(K::ZgcConcurrentDetachedPages, "zgc_concurrent_detached_pages", "Concurrent Destroy Detached Pages", "Concurrent Destroy Detached Pages", All, false, SelfContained),
    info(K::ZgcConcurrentSelectRelocSet, "zgc_concurrent_select_reloc_set", "Concurrent Select Relocation Set", "Concurrent Select Relocation Set", All, false, SelfContained),
    info(K::ZgcConcurrentPrepareRelocSet, "zgc_concurrent_prepare_reloc_set", "Concurrent Prepare Relocation Set", "Concurrent Prepare Relocation Set", All, false, SelfContained),
    info(K::ZgcConcurrentRelocate, "zgc_concurrent_relocate", "Concurrent Relocate", "Concurrent Relocate", All, false, SelfContained),
    // ZGC cycle summaries, one kind per cause
    zgc_cycle(K::ZgcGcMetadataGcThreshold, "zgc_gc_metadata_gc_threshold", "Garbage Collection (Metadata GC Threshold)", "Metadata GC Threshold"),
    zgc_cycle(K::ZgcGcWarmup, "zgc_gc_warmup", "Garbage Collection (Warmup)", "Warmup"),
    zgc_cycle(K::ZgcGcProactive, "zgc_gc_proactive", "Garbage Collection (Proactive)", "Proactive"),
    zgc_cycle(K::ZgcGcAllocationRate, "zgc_gc_allocation_rate", "Garbage Collection (Allocation Rate)", "Allocation Rate"),
    zgc_cycle(K::ZgcGcSystemGc, "zgc_gc_system_gc", "Garbage Collection (System.gc())", "System.gc()"),
    zgc_cycle(K::ZgcGcAllocationStall, "zgc_gc_allocation_stall", "Garbage Collection (Allocation Stall)", "Allocation Stall"),
    zgc_cycle(K::ZgcGcHighUsage, "zgc_gc_high_usage", "Garbage Collection (High Usage)", "High Usage"),
    zgc_cycle(K::ZgcGcTimer, "zgc_gc_timer", "Garbage Collection (Timer)", "Timer"),
    info(K::ZgcHeapCapacity, "zgc_heap_capacity", "Heap Capacity", "Capacity:", All, false, Detail),
    // G1
    info(K::G1PauseYoungNormal, "g1_pause_young_normal", "Pause Young (Normal)", "Pause Young (Normal)", Young, true, Paired),
    info(K::G1PauseYoungConcurrentStart, "g1_pause_young_concurrent_start", "Pause Young (Concurrent Start)", "Pause Young (Concurrent Start)", Young, true, Paired),
    info(K::G1PauseYoungInitialMark, "g1_pause_young_initial_mark", "Pause Young (Initial Mark)", "Pause Young (Initial Mark)", Young, true, Paired),
    info(K::G1PauseYoungPrepareMixed, "g1_pause_young_prepare_mixed", "Pause Young (Prepare Mixed)", "Pause Young (Prepare Mixed)", Young, true, Paired),
    info(K::G1PauseYoungMixed, "g1_pause_young_mixed", "Pause Young (Mixed)", "Pause Young (Mixed)", Young, true, Paired),
    info(K::G1PauseRemark, "g1_pause_remark", "Pause Remark", "Pause Remark", Old, true, Paired),
    info(K::G1PauseCleanup, "g1_pause_cleanup", "Pause Cleanup", "Pause Cleanup", Old, true, Paired),
    info(K::G1ConcurrentCycle, "g1_concurrent_cycle", "Concurrent Cycle", "Concurrent Cycle", Old, false, Paired),
    info(K::G1ConcurrentMarkCycle, "g1_concurrent_mark_cycle", "Concurrent Mark Cycle", "Concurrent Mark Cycle", Old, false, Paired),
    info(K::G1ConcurrentClearClaimedMarks, "g1_concurrent_clear_claimed_marks", "Concurrent Clear Claimed Marks", "Concurrent Clear Claimed Marks", Old, false, Paired),
    info(K::G1ConcurrentScanRootRegions, "g1_concurrent_scan_root_regions", "Concurrent Scan Root Regions", "Concurrent Scan Root Regions", Old, false, Paired),
    info(K::G1ConcurrentMark, "g1_concurrent_mark", "Concurrent Mark", "Concurrent Mark (", Old, false, Paired),
    info(K::G1ConcurrentMarkFromRoots, "g1_concurrent_mark_from_roots", "Concurrent Mark From Roots", "Concurrent Mark From Roots", Old, false, Paired),
    info(K::G1ConcurrentPreclean, "g1_concurrent_preclean", "Concurrent Preclean", "Concurrent Preclean", Old, false, Paired),
    info(K::G1ConcurrentRebuildRemSets, "g1_concurrent_rebuild_rem_sets", "Concurrent Rebuild Remembered Sets", "Concurrent Rebuild Remembered Sets", Old, false, Paired),
    info(K::G1ConcurrentCleanupForNextMark, "g1_concurrent_cleanup_for_next_mark", "Concurrent Cleanup for Next Mark", "Concurrent Cleanup for Next Mark", Old, false, Paired),
    // Serial / Parallel
    info(K::PauseYoung, "pause_young", "Pause Young", "Pause Young", Young, true, Paired),
    info(K::PauseFull, "pause_full", "Pause Full", "Pause Full", All, true, Paired),
    // Shenandoah
    info(K::ShenPauseInitMark, "shen_pause_init_mark", "Pause Init Mark", "Pause Init Mark", All, true, Paired),
    info(K::ShenPauseFinalMark, "shen_pause_final_mark", "Pause Final Mark", "Pause Final Mark", All, true, Paired),
    info(K::ShenPauseInitUpdateRefs, "shen_pause_init_update_refs", "Pause Init Update Refs", "Pause Init Update Refs", All, true, Paired),
    info(K::ShenPauseFinalUpdateRefs, "shen_pause_final_update_refs", "Pause Final Update Refs", "Pause Final Update Refs", All, true, Paired),
    info(K::ShenPauseDegenerated, "shen_pause_degenerated", "Pause Degenerated GC", "Pause Degenerated GC", All, true, Paired),
    info(K::ShenConcurrentReset, "shen_concurrent_reset", "Concurrent reset", "Concurrent reset", All, false, Paired),
    info(K::ShenConcurrentMarking, "shen_concurrent_marking", "Concurrent marking", "Concurrent marking", All, false, Paired),
    info(K::ShenConcurrentCleanup, "shen_concurrent_cleanup", "Concurrent cleanup", "Concurrent cleanup", All, false, Paired),
    info(K::ShenConcurrentEvacuation, "shen_concurrent_evacuation", "Concurrent evacuation", "Concurrent evacuation", All, false, Paired),
    info(K::ShenConcurrentUpdateRefs, "shen_concurrent_update_refs", "Concurrent update references", "Concurrent update references", All, false, Paired),
];

impl EventKind {
    pub fn info(self) -> &'static KindInfo {
        &KINDS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn label(self) -> &'static str {
        self.info().label
    }

    pub fn generation(self) -> Generation {
        self.info().generation
    }

    pub fn is_pause(self) -> bool {
        self.info().is_pause
    }

    /// A full collection reclaims the whole heap: pauses with generation `All`
    pub fn is_full(self) -> bool {
        self.is_pause() && self.generation() == Generation::All
    }

    pub fn form(self) -> LineForm {
        self.info().form
    }

    /// Statistics partition events of this kind belong to
    pub fn partition(self) -> Partition {
        if !self.is_pause() {
            Partition::Concurrent
        } else if self.is_full() {
            Partition::FullPause
        } else {
            Partition::Pause
        }
    }

    pub fn all() -> impl Iterator<Item = EventKind> {
        KINDS.iter().map(|info| info.kind)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<EventKind> for &'static str {
    fn from(kind: EventKind) -> Self {
        kind.name()
    }
}

/// Error for an event kind name that is not in the table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        KINDS
            .iter()
            .find(|info| info.name == wanted)
            .map(|info| info.kind)
            .ok_or_else(|| UnknownEventKind(wanted.to_string()))
    }
}

impl TryFrom<String> for EventKind {
    type Error = UnknownEventKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// In-progress event record, owned by the correlator until it completes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDescriptor {
    pub kind: EventKind,
    pub label: &'static str,
    /// Seconds since process start
    pub timestamp: Option<f64>,
    /// Seconds
    pub duration: Option<f64>,
    pub memory_before_kb: Option<u64>,
    pub memory_after_kb: Option<u64>,
    pub memory_total_kb: Option<u64>,
    pub generation: Generation,
    pub is_pause: bool,
    /// `n` of the `GC(n)` prefix
    pub cycle_id: Option<u64>,
    pub cause: Option<String>,
}

impl EventDescriptor {
    pub fn new(
        kind: EventKind,
        timestamp: Option<f64>,
        cycle_id: Option<u64>,
        fields: PartialFields,
    ) -> Self {
        let cause = fields
            .cause
            .or_else(|| kind.info().cause.map(str::to_string));
        Self {
            kind,
            label: kind.label(),
            timestamp,
            duration: fields.duration,
            memory_before_kb: fields.memory_before_kb,
            memory_after_kb: fields.memory_after_kb,
            memory_total_kb: fields.memory_total_kb,
            generation: kind.generation(),
            is_pause: kind.is_pause(),
            cycle_id,
            cause,
        }
    }

    /// Re-type the record, keeping the collected fields
    pub(crate) fn retype(&mut self, kind: EventKind) {
        self.kind = kind;
        self.label = kind.label();
        self.generation = kind.generation();
        self.is_pause = kind.is_pause();
    }

    pub fn partition(&self) -> Partition {
        self.kind.partition()
    }
}

/// Immutable completed event; read access goes through `Deref`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FinishedEvent(EventDescriptor);

impl FinishedEvent {
    pub(crate) fn new(descriptor: EventDescriptor) -> Self {
        Self(descriptor)
    }
}

impl Deref for FinishedEvent {
    type Target = EventDescriptor;

    fn deref(&self) -> &EventDescriptor {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_table_indexed_by_discriminant() {
        for (i, info) in KINDS.iter().enumerate() {
            assert_eq!(info.kind as usize, i, "table row {} is {:?}", i, info.kind);
        }
    }

    #[test]
    fn test_kind_names_are_unique_and_parse_back() {
        let mut names = std::collections::HashSet::new();
        for kind in EventKind::all() {
            assert!(names.insert(kind.name()), "duplicate name {}", kind.name());
            assert_eq!(kind.name().parse::<EventKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_unknown_kind_name_rejected() {
        let err = "pause_sideways".parse::<EventKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown event kind: pause_sideways");
    }

    #[test]
    fn test_kind_serializes_as_name() {
        let json = serde_json::to_string(&EventKind::ZgcPauseMarkEnd).unwrap();
        assert_eq!(json, "\"zgc_pause_mark_end\"");
        let kind: EventKind = serde_json::from_str("\"g1_pause_remark\"").unwrap();
        assert_eq!(kind, EventKind::G1PauseRemark);
    }

    #[test]
    fn test_partitions() {
        assert_eq!(EventKind::ZgcPauseMarkStart.partition(), Partition::FullPause);
        assert_eq!(EventKind::ZgcGcWarmup.partition(), Partition::FullPause);
        assert_eq!(EventKind::ZgcConcurrentMark.partition(), Partition::Concurrent);
        assert_eq!(EventKind::G1PauseYoungNormal.partition(), Partition::Pause);
        assert_eq!(EventKind::G1PauseRemark.partition(), Partition::Pause);
        assert_eq!(EventKind::PauseFull.partition(), Partition::FullPause);
        assert_eq!(EventKind::G1ConcurrentCycle.partition(), Partition::Concurrent);
        assert_eq!(EventKind::ShenPauseInitMark.partition(), Partition::FullPause);
    }

    #[test]
    fn test_zgc_cycle_kinds_carry_cause() {
        let event = EventDescriptor::new(
            EventKind::ZgcGcSystemGc,
            Some(1.5),
            Some(3),
            PartialFields::default(),
        );
        assert_eq!(event.cause.as_deref(), Some("System.gc()"));
        assert_eq!(event.label, "Garbage Collection (System.gc())");
        assert_eq!(event.generation, Generation::All);
        assert!(event.is_pause);
    }

    #[test]
    fn test_retype_updates_derived_fields() {
        let mut event = EventDescriptor::new(
            EventKind::ZgcPauseMarkStart,
            Some(0.5),
            None,
            PartialFields::default(),
        );
        event.retype(EventKind::ZgcConcurrentMark);
        assert_eq!(event.label, "Concurrent Mark");
        assert!(!event.is_pause);
        assert_eq!(event.timestamp, Some(0.5));
    }
}
