//! gclens - parser and event model for JVM unified GC logs
//!
//! This library turns `-Xlog:gc*` output (ZGC, Shenandoah, G1, Serial and
//! Parallel collectors) into an ordered list of GC events with running
//! per-category statistics, partitioned into pauses, full pauses and
//! concurrent phases.
//!
//! ```
//! use gclens::{parse_str, EventKind};
//!
//! let model = parse_str(
//!     "[0.999s][info][gc,phases] GC(0) Pause Mark Start 1.279ms\n\
//!      [1.005s][info][gc,phases] GC(0) Concurrent Mark 5.216ms\n",
//! );
//! assert_eq!(model.size(), 2);
//! assert_eq!(model.concurrent_event_categories(), vec![EventKind::ZgcConcurrentMark]);
//! ```

pub mod classify;
pub mod cli;
pub mod config;
pub mod correlator;
pub mod event;
pub mod extract;
pub mod model;
pub mod parser;
pub mod stats;
pub mod summary;
pub mod units;

pub use classify::{classify, Classification, Role};
pub use config::{ConfigError, MergeRule, ParserConfig};
pub use event::{EventDescriptor, EventKind, FinishedEvent, Generation, Partition};
pub use model::{EventModel, ModelError};
pub use parser::{parse_lines, parse_str, GcLogParser, ParseStats};
pub use stats::{CategoryStats, StatBucket, StatsSummary};
