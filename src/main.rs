use anyhow::{Context, Result};
use clap::Parser;
use gclens::cli::{Cli, OutputFormat};
use gclens::config::ParserConfig;
use gclens::model::EventModel;
use gclens::parser::{GcLogParser, ParseStats};
use gclens::summary::ModelSummary;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Configuration file (if any) plus `--merge` rules from the command line
fn load_config(args: &Cli) -> Result<ParserConfig> {
    let mut config = match &args.config {
        Some(path) => ParserConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ParserConfig::default(),
    };
    config.merge_rules.extend(args.merge.iter().copied());
    Ok(config)
}

/// Feed the log line by line. Invalid UTF-8 is replaced, not rejected.
fn parse_file(path: &Path, config: &ParserConfig) -> Result<(EventModel, ParseStats)> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut parser = GcLogParser::with_config(config)?;

    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if read == 0 {
            break;
        }
        parser.feed(&String::from_utf8_lossy(&buf));
    }

    Ok(parser.finish_with_stats())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(&args)?;
    let (model, stats) = parse_file(&args.log_file, &config)?;

    let mut summary = ModelSummary::new(&model, stats);
    if args.events {
        summary = summary.with_events(&model);
    }

    match args.format {
        OutputFormat::Text => print!("{}", summary.render_text()),
        OutputFormat::Json => println!("{}", summary.to_json()?),
    }

    Ok(())
}
