//! CLI argument parsing for gclens

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::MergeRule;

/// Output format for the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "gclens")]
#[command(version)]
#[command(about = "Summarize JVM unified GC logs into pause, full and concurrent statistics", long_about = None)]
pub struct Cli {
    /// GC log file (-Xlog:gc* output)
    #[arg(value_name = "FILE")]
    pub log_file: PathBuf,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Parser configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Pair two single-line phases into one event, by kind name
    /// (e.g. --merge zgc_pause_mark_start=zgc_pause_mark_end)
    #[arg(long = "merge", value_name = "START=END", value_parser = parse_merge_rule)]
    pub merge: Vec<MergeRule>,

    /// List every event, not only the statistics
    #[arg(long = "events")]
    pub events: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

fn parse_merge_rule(spec: &str) -> Result<MergeRule, String> {
    MergeRule::parse(spec).map_err(|e| e.to_string())
}
