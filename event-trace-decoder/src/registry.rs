//! Identity registry
//!
//! Groups every record of a trace by event handle, keeping trace order within
//! each group. Built once per trace and read-only afterwards, so one registry
//! can serve any number of queries, including concurrent ones.

use crate::types::{EventHandle, EventKind, EventRecord, Result, TraceError};
use std::collections::BTreeMap;

/// Handle → records index for one trace
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    /// Key: event handle, Value: its records in trace order
    records: BTreeMap<EventHandle, Vec<EventRecord>>,
}

impl IdentityRegistry {
    /// Partition records by handle in one pass
    ///
    /// Records with an empty handle have no identity and are excluded.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = EventRecord>,
    {
        let mut by_handle: BTreeMap<EventHandle, Vec<EventRecord>> = BTreeMap::new();

        for record in records {
            if record.handle.as_str().is_empty() {
                log::trace!("Skipping record #{} without handle", record.sequence_index);
                continue;
            }
            by_handle
                .entry(record.handle.clone())
                .or_default()
                .push(record);
        }

        log::debug!("Registry built with {} handles", by_handle.len());
        Self { records: by_handle }
    }

    /// Get the records of a handle in trace order
    ///
    /// # Returns
    /// * `Err(TraceError::UnknownHandle)` if the trace never mentions the handle
    pub fn lookup(&self, handle: &str) -> Result<&[EventRecord]> {
        self.records
            .get(handle)
            .map(Vec::as_slice)
            .ok_or_else(|| TraceError::UnknownHandle(EventHandle::from(handle)))
    }

    /// Check if the registry has records for a handle
    pub fn contains(&self, handle: &str) -> bool {
        self.records.contains_key(handle)
    }

    /// All handles, in sorted order
    pub fn handles(&self) -> impl Iterator<Item = &EventHandle> {
        self.records.keys()
    }

    /// Iterate over handles with their records
    pub fn iter(&self) -> impl Iterator<Item = (&EventHandle, &[EventRecord])> {
        self.records.iter().map(|(h, r)| (h, r.as_slice()))
    }

    /// True if the registry holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStats {
        let num_records = self.records.values().map(Vec::len).sum();
        let num_signals = self
            .records
            .values()
            .flatten()
            .filter(|r| r.kind() == EventKind::Signal)
            .count();

        RegistryStats {
            num_handles: self.records.len(),
            num_records,
            num_signals,
        }
    }
}

/// Registry statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Distinct event handles
    pub num_handles: usize,
    /// Total lifecycle records
    pub num_records: usize,
    /// Records of kind SIGNAL
    pub num_signals: usize,
}
