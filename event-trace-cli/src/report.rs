//! Text report generation
//!
//! Renders resolved chains and their verdicts. The layout is meant for
//! reading, not parsing, and may change between versions.

use event_trace_decoder::{
    format_time_of_day, ChainAnalysis, EventKind, EventRecord, IdentityRegistry, ResolvedSequence,
    TraceError,
};
use std::io::{self, Write};

const RULE: &str = "───────────────────────────────────────────────";

/// What a chain report includes
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub show_thread_ids: bool,
    /// Only print verdicts, not the record listing
    pub summary_only: bool,
}

/// Write the report for one resolved chain
pub fn write_chain<W: Write>(
    out: &mut W,
    chain: &ResolvedSequence<'_>,
    analysis: &ChainAnalysis<'_>,
    options: ReportOptions,
) -> io::Result<()> {
    writeln!(out, "\n🔗 Dependency chain of {}", chain.seed())?;
    writeln!(out, "{}", RULE)?;
    writeln!(
        out,
        "  {} records across {} events",
        chain.len(),
        chain.handles().len()
    )?;

    for warning in chain.warnings() {
        writeln!(out, "  ⚠️  {}", warning)?;
    }

    if !options.summary_only {
        writeln!(out)?;
        for record in chain.records() {
            writeln!(out, "  {}", format_record(record, options.show_thread_ids))?;
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "  reset between signal and wait: {}",
        analysis.reset_between_signal_and_wait()
    )?;
    if let Some(reset) = analysis.reset_race {
        writeln!(out, "    offending reset: {}", format_record(reset, options.show_thread_ids))?;
    }
    for race in &analysis.handle_races {
        writeln!(
            out,
            "    {} reset at #{} between its own signal and wait",
            race.handle, race.reset.sequence_index
        )?;
    }

    writeln!(out, "  every event signaled:          {}", analysis.all_signaled())?;
    for handle in &analysis.never_signaled {
        writeln!(out, "    never signaled: {}", handle)?;
    }

    if analysis.midnight_wrap_suspected {
        writeln!(out, "  ⚠️  timestamps wrap past midnight; order may be wrong")?;
    }

    Ok(())
}

/// Write a failed query
pub fn write_failure<W: Write>(out: &mut W, handle: &str, error: &TraceError) -> io::Result<()> {
    writeln!(out, "\n✗ Query {} failed: {}", handle, error)
}

/// Write every handle of the registry with its record count
pub fn write_handle_list<W: Write>(out: &mut W, registry: &IdentityRegistry) -> io::Result<()> {
    writeln!(out, "\n📋 Event handles:")?;
    for (handle, records) in registry.iter() {
        let signaled = records.iter().any(|r| r.kind() == EventKind::Signal);
        writeln!(
            out,
            "  {:<20} {:>6} records{}",
            handle.as_str(),
            records.len(),
            if signaled { "" } else { "  (never signaled)" }
        )?;
    }
    Ok(())
}

fn format_record(record: &EventRecord, show_thread_id: bool) -> String {
    let mut line = format!(
        "{:<18}  #{:<7} {:<8}{}",
        format_time_of_day(record.timestamp),
        record.sequence_index,
        record.kind(),
        record.handle
    );
    if show_thread_id {
        if let Some(tid) = &record.thread_id {
            line.push_str(&format!("  [vtid {}]", tid));
        }
    }
    if !record.depends_on().is_empty() {
        let deps: Vec<&str> = record.depends_on().iter().map(|h| h.as_str()).collect();
        line.push_str(&format!("  waits on [{}]", deps.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_trace_decoder::{DependencyResolver, EventHandle, EventOp};

    fn record(handle: &str, op: EventOp, idx: usize, ts: f64) -> EventRecord {
        EventRecord {
            handle: EventHandle::from(handle),
            op,
            timestamp: Some(ts),
            thread_id: Some("42".to_string()),
            sequence_index: idx,
        }
    }

    fn registry() -> IdentityRegistry {
        IdentityRegistry::build(vec![
            record("0xb", EventOp::Create, 0, 1.0),
            record(
                "0xa",
                EventOp::Signal {
                    depends_on: vec![EventHandle::from("0xb")],
                },
                1,
                2.0,
            ),
            record("0xa", EventOp::Reset, 2, 3.0),
            record("0xa", EventOp::Wait, 3, 4.0),
        ])
    }

    fn render(options: ReportOptions) -> String {
        let registry = registry();
        let chain = DependencyResolver::new(&registry).resolve_sorted("0xa").unwrap();
        let analysis = ChainAnalysis::evaluate(&chain);

        let mut out = Vec::new();
        write_chain(&mut out, &chain, &analysis, options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_chain_report_contents() {
        let text = render(ReportOptions {
            show_thread_ids: true,
            summary_only: false,
        });

        assert!(text.contains("Dependency chain of 0xa"));
        assert!(text.contains("waits on [0xb]"));
        assert!(text.contains("[vtid 42]"));
        assert!(text.contains("reset between signal and wait: true"));
        assert!(text.contains("never signaled: 0xb"));
    }

    #[test]
    fn test_summary_only_omits_records() {
        let text = render(ReportOptions {
            show_thread_ids: false,
            summary_only: true,
        });

        assert!(!text.contains("#0 "));
        assert!(text.contains("reset between signal and wait: true"));
    }

    #[test]
    fn test_handle_list_marks_unsignaled_events() {
        let mut out = Vec::new();
        write_handle_list(&mut out, &registry()).unwrap();
        let text = String::from_utf8(out).unwrap();

        let b_line = text.lines().find(|l| l.contains("0xb")).unwrap();
        assert!(b_line.contains("never signaled"));
        let a_line = text.lines().find(|l| l.contains("0xa")).unwrap();
        assert!(!a_line.contains("never signaled"));
    }
}
