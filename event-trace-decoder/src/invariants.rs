//! Temporal invariant checks
//!
//! Every check is a pure function of a chronologically sorted record
//! sequence. [`ChainAnalysis`] runs all of them over one resolved chain.

use crate::traversal::ResolvedSequence;
use crate::types::{EventHandle, EventKind, EventRecord};
use std::collections::HashSet;

/// Backwards jump (in seconds) that only a trace crossing midnight explains
pub const MIDNIGHT_WRAP_THRESHOLD: f64 = 12.0 * 3600.0;

/// Find a RESET between the first SIGNAL and the first WAIT
///
/// Scans `[first SIGNAL, first WAIT)`. A reset in that window clears the
/// signal before the waiter observes it.
///
/// # Returns
/// * `Some(reset)` - the first offending RESET record
/// * `None` - no violation, or no SIGNAL/WAIT to evaluate against
pub fn find_reset_between_signal_and_wait<'a>(
    sequence: &[&'a EventRecord],
) -> Option<&'a EventRecord> {
    let signal = sequence.iter().position(|r| r.kind() == EventKind::Signal)?;
    let wait = sequence.iter().position(|r| r.kind() == EventKind::Wait)?;
    if wait <= signal {
        return None;
    }

    sequence[signal..wait]
        .iter()
        .copied()
        .find(|r| r.kind() == EventKind::Reset)
}

/// True if the event was reset between being signaled and being waited on
pub fn reset_between_signal_and_wait(sequence: &[&EventRecord]) -> bool {
    find_reset_between_signal_and_wait(sequence).is_some()
}

/// True iff the sequence holds at least one SIGNAL
pub fn ever_signaled(sequence: &[&EventRecord]) -> bool {
    sequence.iter().any(|r| r.kind() == EventKind::Signal)
}

/// Handles of the sequence whose own records never include a SIGNAL
///
/// Returned in order of first appearance.
pub fn never_signaled_handles<'a>(sequence: &[&'a EventRecord]) -> Vec<&'a EventHandle> {
    let signaled: HashSet<&EventHandle> = sequence
        .iter()
        .filter(|r| r.kind() == EventKind::Signal)
        .map(|r| &r.handle)
        .collect();

    let mut seen = HashSet::new();
    sequence
        .iter()
        .copied()
        .map(|r| &r.handle)
        .filter(|h| !signaled.contains(h) && seen.insert(*h))
        .collect()
}

/// True if timestamps jump backwards by more than half a day in trace order
pub fn midnight_wrap_suspected(sequence: &[&EventRecord]) -> bool {
    let mut in_trace_order: Vec<&EventRecord> = sequence.to_vec();
    in_trace_order.sort_by_key(|r| r.sequence_index);

    let mut latest = f64::NEG_INFINITY;
    for seconds in in_trace_order.iter().filter_map(|r| r.timestamp) {
        if seconds < latest - MIDNIGHT_WRAP_THRESHOLD {
            return true;
        }
        latest = latest.max(seconds);
    }
    false
}

/// A reset race confined to one handle's own records
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleRace<'a> {
    pub handle: &'a EventHandle,
    pub reset: &'a EventRecord,
}

/// Verdicts for one resolved chain
#[derive(Debug, Clone)]
pub struct ChainAnalysis<'a> {
    /// Handle the chain was resolved from
    pub seed: EventHandle,
    /// Offending RESET over the whole chain, if any
    pub reset_race: Option<&'a EventRecord>,
    /// Races found within individual handles of the chain
    pub handle_races: Vec<HandleRace<'a>>,
    /// Handles of the chain that are never signaled (liveness risk)
    pub never_signaled: Vec<&'a EventHandle>,
    /// Timestamps suggest the trace crossed midnight, so the order is suspect
    pub midnight_wrap_suspected: bool,
}

impl<'a> ChainAnalysis<'a> {
    /// Evaluate every check over a chronologically sorted chain
    pub fn evaluate(sequence: &ResolvedSequence<'a>) -> Self {
        let records = sequence.records();

        let handle_races = sequence
            .handles()
            .into_iter()
            .filter_map(|handle| {
                let own = sequence.records_for(handle);
                find_reset_between_signal_and_wait(&own).map(|reset| HandleRace { handle, reset })
            })
            .collect();

        let analysis = Self {
            seed: sequence.seed().clone(),
            reset_race: find_reset_between_signal_and_wait(records),
            handle_races,
            never_signaled: never_signaled_handles(records),
            midnight_wrap_suspected: midnight_wrap_suspected(records),
        };

        if analysis.midnight_wrap_suspected {
            log::warn!(
                "Timestamps in the chain of {} jump backwards by more than 12h; ordering may be wrong",
                analysis.seed
            );
        }
        analysis
    }

    /// Whole-chain reset-between-signal-and-wait verdict
    pub fn reset_between_signal_and_wait(&self) -> bool {
        self.reset_race.is_some()
    }

    /// True if every handle of the chain is signaled at least once
    pub fn all_signaled(&self) -> bool {
        self.never_signaled.is_empty()
    }

    /// True if any check flagged the chain
    pub fn has_findings(&self) -> bool {
        self.reset_between_signal_and_wait()
            || !self.handle_races.is_empty()
            || !self.all_signaled()
    }
}
