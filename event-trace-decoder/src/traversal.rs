//! Dependency traversal engine
//!
//! Resolves the full chain of records a seed event depends on. A signal record
//! is a join point: the records of every event in its wait-list are expanded
//! first, and the signal itself is emitted only once all of them are done.
//!
//! The traversal runs on an explicit stack rather than recursion, so deep
//! chains cost heap memory instead of call depth. A record that is reached
//! again while its own expansion is still open closes a cycle in the
//! signal → wait-list → signal graph and aborts the query with
//! `TraceError::CircularDependency`. A record reached again after it was
//! emitted (two signals sharing a dependency) is skipped: first emission wins.

use crate::registry::IdentityRegistry;
use crate::types::{EventHandle, EventOp, EventRecord, RecordKey, Result, TraceError};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// Non-fatal anomaly found while resolving a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    /// A signal waits on an event the trace never mentions
    UnknownDependency {
        /// Handle of the signal record
        signal: EventHandle,
        /// Sequence index of the signal record
        signal_index: usize,
        /// Wait-list entry with no records
        missing: EventHandle,
    },
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveWarning::UnknownDependency {
                signal,
                signal_index,
                missing,
            } => write!(
                f,
                "signal of {} (#{}) waits on unknown event {}",
                signal, signal_index, missing
            ),
        }
    }
}

/// Records reachable from one seed handle
#[derive(Debug, Clone)]
pub struct ResolvedSequence<'a> {
    seed: EventHandle,
    records: Vec<&'a EventRecord>,
    warnings: Vec<ResolveWarning>,
}

impl<'a> ResolvedSequence<'a> {
    /// Handle the query started from
    pub fn seed(&self) -> &EventHandle {
        &self.seed
    }

    /// Records in their current order (emission order until sorted)
    pub fn records(&self) -> &[&'a EventRecord] {
        &self.records
    }

    /// Unknown dependencies met on the way
    pub fn warnings(&self) -> &[ResolveWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sort by `(timestamp, sequence_index)`; null timestamps go last
    pub fn sort_chronologically(&mut self) {
        self.records.sort_by(|a, b| chronological_order(a, b));
    }

    /// Consume and return the chronologically sorted sequence
    pub fn into_chronological(mut self) -> Self {
        self.sort_chronologically();
        self
    }

    /// Distinct handles in order of first appearance
    pub fn handles(&self) -> Vec<&'a EventHandle> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .copied()
            .map(|r| &r.handle)
            .filter(|h| seen.insert(*h))
            .collect()
    }

    /// Sub-sequence of one handle, in the current order
    pub fn records_for(&self, handle: &EventHandle) -> Vec<&'a EventRecord> {
        self.records
            .iter()
            .copied()
            .filter(|r| &r.handle == handle)
            .collect()
    }
}

/// Ordering used for chronological sorts
///
/// Records with a timestamp come first, ascending; records without one sort
/// as if stamped at +infinity. Ties fall back to trace order.
pub fn chronological_order(a: &EventRecord, b: &EventRecord) -> Ordering {
    let by_time = match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_time.then(a.sequence_index.cmp(&b.sequence_index))
}

/// Worklist entries
enum Frame<'a> {
    /// Visit a record
    Enter(&'a EventRecord),
    /// All dependencies of this signal are resolved
    Complete(&'a EventRecord),
}

/// Resolves dependency chains against a registry
pub struct DependencyResolver<'a> {
    registry: &'a IdentityRegistry,
}

impl<'a> DependencyResolver<'a> {
    /// Create a resolver over a built registry
    pub fn new(registry: &'a IdentityRegistry) -> Self {
        Self { registry }
    }

    /// Resolve every record a seed handle transitively depends on
    ///
    /// # Arguments
    /// * `seed` - Handle to start from
    ///
    /// # Returns
    /// * `Ok(ResolvedSequence)` in emission order (dependencies before the signal
    ///   that waited on them)
    /// * `Err(TraceError::UnknownHandle)` if the seed has no records
    /// * `Err(TraceError::CircularDependency)` naming the handle that closed a cycle
    pub fn resolve(&self, seed: &str) -> Result<ResolvedSequence<'a>> {
        let seed_records = self.registry.lookup(seed)?;
        log::debug!("Resolving {} from {} seed records", seed, seed_records.len());

        // Reversed so the stack pops in trace order
        let mut worklist: Vec<Frame<'a>> = seed_records.iter().rev().map(Frame::Enter).collect();
        let mut open: HashSet<RecordKey<'a>> = HashSet::new();
        let mut emitted: HashSet<RecordKey<'a>> = HashSet::new();
        let mut records = Vec::new();
        let mut warnings = Vec::new();

        while let Some(frame) = worklist.pop() {
            match frame {
                Frame::Enter(record) => {
                    let key = record.key();
                    if emitted.contains(&key) {
                        log::trace!("Already emitted: {} #{}", record.handle, record.sequence_index);
                        continue;
                    }
                    if !open.insert(key) {
                        log::debug!("Cycle closed at {} #{}", record.handle, record.sequence_index);
                        return Err(TraceError::CircularDependency(record.handle.clone()));
                    }

                    match &record.op {
                        EventOp::Signal { depends_on } => {
                            worklist.push(Frame::Complete(record));
                            for dependency in depends_on.iter().rev() {
                                match self.registry.lookup(dependency.as_str()) {
                                    Ok(dep_records) => {
                                        worklist.extend(dep_records.iter().rev().map(Frame::Enter));
                                    }
                                    Err(_) => {
                                        log::warn!(
                                            "Signal of {} (#{}) waits on unknown event {}",
                                            record.handle,
                                            record.sequence_index,
                                            dependency
                                        );
                                        warnings.push(ResolveWarning::UnknownDependency {
                                            signal: record.handle.clone(),
                                            signal_index: record.sequence_index,
                                            missing: dependency.clone(),
                                        });
                                    }
                                }
                            }
                        }
                        _ => {
                            open.remove(&key);
                            emitted.insert(key);
                            records.push(record);
                        }
                    }
                }
                Frame::Complete(record) => {
                    let key = record.key();
                    open.remove(&key);
                    emitted.insert(key);
                    records.push(record);
                }
            }
        }

        log::debug!("Resolved {} records for {}", records.len(), seed);
        Ok(ResolvedSequence {
            seed: EventHandle::from(seed),
            records,
            warnings,
        })
    }

    /// Resolve and sort chronologically in one step
    pub fn resolve_sorted(&self, seed: &str) -> Result<ResolvedSequence<'a>> {
        self.resolve(seed).map(ResolvedSequence::into_chronological)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind;

    fn record(handle: &str, op: EventOp, idx: usize, ts: Option<f64>) -> EventRecord {
        EventRecord {
            handle: EventHandle::from(handle),
            op,
            timestamp: ts,
            thread_id: None,
            sequence_index: idx,
        }
    }

    fn signal(handle: &str, deps: &[&str], idx: usize, ts: f64) -> EventRecord {
        record(
            handle,
            EventOp::Signal {
                depends_on: deps.iter().map(|d| EventHandle::from(*d)).collect(),
            },
            idx,
            Some(ts),
        )
    }

    fn summary(seq: &ResolvedSequence<'_>) -> Vec<(String, EventKind)> {
        seq.records()
            .iter()
            .map(|r| (r.handle.to_string(), r.kind()))
            .collect()
    }

    #[test]
    fn test_dependency_expansion() {
        let registry = IdentityRegistry::build(vec![
            record("H2", EventOp::Create, 0, Some(1.0)),
            record("H3", EventOp::Create, 1, Some(2.0)),
            signal("H1", &["H2", "H3"], 2, 3.0),
        ]);

        let seq = DependencyResolver::new(&registry).resolve_sorted("H1").unwrap();
        assert_eq!(
            summary(&seq),
            vec![
                ("H2".to_string(), EventKind::Create),
                ("H3".to_string(), EventKind::Create),
                ("H1".to_string(), EventKind::Signal),
            ]
        );
        assert!(seq.warnings().is_empty());
    }

    #[test]
    fn test_signal_emitted_after_dependencies() {
        // Dependencies stamped later than the signal still precede it before sorting
        let registry = IdentityRegistry::build(vec![
            signal("H1", &["H2", "H3"], 0, 1.0),
            record("H2", EventOp::Create, 1, Some(2.0)),
            record("H3", EventOp::Create, 2, Some(3.0)),
        ]);

        let seq = DependencyResolver::new(&registry).resolve("H1").unwrap();
        let order: Vec<usize> = seq.records().iter().map(|r| r.sequence_index).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_unknown_seed() {
        let registry = IdentityRegistry::build(vec![record("H1", EventOp::Create, 0, None)]);
        let result = DependencyResolver::new(&registry).resolve("H9");
        assert!(matches!(result, Err(TraceError::UnknownHandle(h)) if h.as_str() == "H9"));
    }

    #[test]
    fn test_direct_cycle_is_reported() {
        let registry = IdentityRegistry::build(vec![
            signal("H1", &["H2"], 0, 1.0),
            signal("H2", &["H1"], 1, 2.0),
        ]);

        match DependencyResolver::new(&registry).resolve("H1") {
            Err(TraceError::CircularDependency(handle)) => assert_eq!(handle.as_str(), "H1"),
            other => panic!("expected CircularDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_self_wait_is_a_cycle() {
        let registry = IdentityRegistry::build(vec![
            record("H1", EventOp::Create, 0, Some(0.5)),
            signal("H1", &["H1"], 1, 1.0),
        ]);
        let result = DependencyResolver::new(&registry).resolve("H1");
        assert!(matches!(result, Err(TraceError::CircularDependency(_))));
    }

    #[test]
    fn test_long_cycle_terminates() {
        let n = 10_000;
        let mut records = Vec::new();
        for i in 0..n {
            let next = format!("H{}", (i + 1) % n);
            records.push(signal(&format!("H{}", i), &[next.as_str()], i, i as f64));
        }
        let registry = IdentityRegistry::build(records);

        let result = DependencyResolver::new(&registry).resolve("H0");
        assert!(matches!(result, Err(TraceError::CircularDependency(_))));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let n = 50_000;
        let mut records = vec![record(&format!("H{}", n), EventOp::Create, n, Some(0.0))];
        for i in 0..n {
            let next = format!("H{}", i + 1);
            records.push(signal(&format!("H{}", i), &[next.as_str()], i, 1.0 + i as f64));
        }
        let registry = IdentityRegistry::build(records);

        let seq = DependencyResolver::new(&registry).resolve("H0").unwrap();
        assert_eq!(seq.len(), n + 1);
    }

    #[test]
    fn test_shared_dependency_is_not_a_cycle() {
        // H1 waits on H2 and H3, both of which wait on H4
        let registry = IdentityRegistry::build(vec![
            record("H4", EventOp::Create, 0, Some(0.0)),
            signal("H4", &[], 1, 1.0),
            signal("H2", &["H4"], 2, 2.0),
            signal("H3", &["H4"], 3, 3.0),
            signal("H1", &["H2", "H3"], 4, 4.0),
        ]);

        let seq = DependencyResolver::new(&registry).resolve("H1").unwrap();
        assert_eq!(seq.len(), 5);

        let mut keys = HashSet::new();
        for r in seq.records() {
            assert!(keys.insert(r.key()), "duplicate record {}", r);
        }
    }

    #[test]
    fn test_unknown_dependency_is_a_warning() {
        let registry = IdentityRegistry::build(vec![
            signal("H1", &["H2", "ghost"], 0, 1.0),
            record("H2", EventOp::Create, 1, Some(0.5)),
        ]);

        let seq = DependencyResolver::new(&registry).resolve("H1").unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(
            seq.warnings(),
            &[ResolveWarning::UnknownDependency {
                signal: EventHandle::from("H1"),
                signal_index: 0,
                missing: EventHandle::from("ghost"),
            }]
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let registry = IdentityRegistry::build(vec![
            record("H2", EventOp::Create, 0, Some(1.0)),
            record("H3", EventOp::Create, 1, None),
            signal("H1", &["H3", "H2"], 2, 3.0),
            record("H1", EventOp::Wait, 3, Some(3.0)),
        ]);
        let resolver = DependencyResolver::new(&registry);

        let first = summary(&resolver.resolve_sorted("H1").unwrap());
        for _ in 0..5 {
            assert_eq!(summary(&resolver.resolve_sorted("H1").unwrap()), first);
        }
    }

    #[test]
    fn test_null_timestamps_sort_last_and_ties_keep_trace_order() {
        let records = vec![
            record("A", EventOp::Create, 0, None),
            record("A", EventOp::Reset, 1, Some(5.0)),
            record("A", EventOp::Query, 2, None),
            record("A", EventOp::Wait, 3, Some(5.0)),
            record("A", EventOp::Destroy, 4, Some(1.0)),
        ];
        let registry = IdentityRegistry::build(records);

        let seq = DependencyResolver::new(&registry).resolve_sorted("A").unwrap();
        let order: Vec<usize> = seq.records().iter().map(|r| r.sequence_index).collect();
        assert_eq!(order, vec![4, 1, 3, 0, 2]);
    }

    #[test]
    fn test_handles_and_sub_sequences() {
        let registry = IdentityRegistry::build(vec![
            record("H2", EventOp::Create, 0, Some(1.0)),
            record("H2", EventOp::Reset, 1, Some(1.5)),
            signal("H1", &["H2"], 2, 2.0),
        ]);

        let seq = DependencyResolver::new(&registry).resolve_sorted("H1").unwrap();
        let handles: Vec<&str> = seq.handles().iter().map(|h| h.as_str()).collect();
        assert_eq!(handles, vec!["H2", "H1"]);
        assert_eq!(seq.records_for(&EventHandle::from("H2")).len(), 2);
        assert_eq!(seq.seed().as_str(), "H1");
    }
}
