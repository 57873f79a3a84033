//! Event Trace Analyzer CLI Application
//!
//! This is the command-line interface for the event trace analyzer.
//! It uses the event-trace-decoder library and adds:
//! - Argument and config file handling
//! - Parallel resolution of several handles over one registry
//! - Text reports

use anyhow::{bail, Context, Result};
use clap::Parser;
use event_trace_decoder::{ChainAnalysis, DependencyResolver, EventHandle, TraceDecoder};
use rayon::prelude::*;
use std::io::{self, Write};
use std::path::PathBuf;

mod config;
mod report;

use config::AppConfig;
use report::ReportOptions;

/// Event Trace Analyzer - Find synchronization bugs in Level Zero event traces
#[derive(Parser, Debug)]
#[command(name = "event-trace-cli")]
#[command(about = "Resolve event dependency chains and check reset/signal races", long_about = None)]
#[command(version)]
struct Args {
    /// Event handle(s) to analyze (e.g. 0x0000556c1d012d80)
    #[arg(value_name = "HANDLE")]
    handles: Vec<String>,

    /// Path to the text trace
    #[arg(short, long, value_name = "FILE")]
    trace: PathBuf,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List every event handle in the trace
    #[arg(short, long)]
    list_handles: bool,

    /// Only print verdicts, not the resolved records
    #[arg(short, long)]
    summary: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Event Trace Analyzer CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", event_trace_decoder::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    analyze(&args, &app_config)
}

/// Build the registry once, then answer every handle query against it
fn analyze(args: &Args, app_config: &AppConfig) -> Result<()> {
    let decoder = TraceDecoder::new(app_config.extractor.clone())?;

    // An unreadable trace ends the run
    let registry = decoder
        .load_registry(&args.trace)
        .with_context(|| format!("Failed to load trace: {:?}", args.trace))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let stats = registry.stats();
    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(out, "  Event Trace Analyzer")?;
    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(out, "\n📊 Trace: {:?}", args.trace)?;
    writeln!(out, "  Events:  {}", stats.num_handles)?;
    writeln!(out, "  Records: {}", stats.num_records)?;
    writeln!(out, "  Signals: {}", stats.num_signals)?;

    if args.list_handles {
        report::write_handle_list(&mut out, &registry)?;
    }

    let handles: Vec<EventHandle> = if args.handles.is_empty() {
        app_config.analysis.handles.clone()
    } else {
        args.handles.iter().map(|h| EventHandle::from(h.as_str())).collect()
    };

    if handles.is_empty() {
        if !args.list_handles {
            writeln!(out, "\nNo event handle specified")?;
            writeln!(out, "\nQuick Start:")?;
            writeln!(out, "  event-trace-cli --trace trace.txt 0x0000556c1d012d80")?;
            writeln!(out, "  event-trace-cli --trace trace.txt --list-handles")?;
            writeln!(out, "\nUse --help for more options")?;
        }
        return Ok(());
    }

    // Queries share the read-only registry
    let resolver = DependencyResolver::new(&registry);
    let outcomes: Vec<_> = handles
        .par_iter()
        .map(|handle| (handle, resolver.resolve_sorted(handle.as_str())))
        .collect();

    let options = ReportOptions {
        show_thread_ids: app_config.analysis.show_thread_ids,
        summary_only: args.summary,
    };

    let mut failed = 0;
    for (handle, outcome) in &outcomes {
        match outcome {
            Ok(chain) => {
                let analysis = ChainAnalysis::evaluate(chain);
                report::write_chain(&mut out, chain, &analysis, options)?;
            }
            Err(e) => {
                log::error!("Query {} failed: {}", handle, e);
                report::write_failure(&mut out, handle.as_str(), e)?;
                failed += 1;
            }
        }
    }
    out.flush()?;

    if failed > 0 {
        bail!("{} of {} queries failed", failed, outcomes.len());
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
