//! Record extraction from raw trace lines
//!
//! Turns one LTTng text line into an [`EventRecord`], or reports that the line
//! is not a lifecycle event. Extraction is lenient: a line that carries a
//! known marker but no usable handle is treated as unrecognized rather than
//! raising an error.
//!
//! ## Recognized shapes
//! - `zeEventCreate_exit: { ..., phEvent_val: 0x... }` → CREATE
//! - `zeEventDestroy_entry / HostReset / QueryStatus / HostSynchronize / HostSignal: { hEvent: 0x... }`
//! - any append operation with `hSignalEvent: 0x...` → SIGNAL, with its
//!   wait-list taken from `phWaitEvents_vals: [ 0x..., 0x... ]`

use crate::config::ExtractorConfig;
use crate::types::{EventHandle, EventKind, EventOp, EventRecord, Result, SecondsOfDay};
use chrono::{NaiveTime, Timelike};
use regex::Regex;

const HANDLE_VALUE: &str = r"(0[xX][0-9a-fA-F]+)";

/// Extracts typed records from trace lines
pub struct RecordExtractor {
    config: ExtractorConfig,
    /// `phEvent_val: 0x...` on create exits
    created_handle: Regex,
    /// `hEvent: 0x...` on every other lifecycle call
    event_handle: Regex,
    /// `<signal_field>: 0x...` on append operations
    signal_handle: Regex,
    wait_list: Regex,
    thread_id: Regex,
}

impl RecordExtractor {
    /// Create an extractor for the given marker configuration
    ///
    /// # Returns
    /// * `Result<RecordExtractor>` - Err if the configured signal field does not
    ///   form a valid pattern
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let signal_field = regex::escape(&config.markers.signal_field);

        Ok(Self {
            created_handle: Regex::new(&format!(r"phEvent_val: {}", HANDLE_VALUE))?,
            event_handle: Regex::new(&format!(r"\bhEvent: {}", HANDLE_VALUE))?,
            signal_handle: Regex::new(&format!(r"\b{}: {}", signal_field, HANDLE_VALUE))?,
            wait_list: Regex::new(r"phWaitEvents_vals: \[([^\]]*)\]")?,
            thread_id: Regex::new(r"vtid: (\d+)")?,
            config,
        })
    }

    /// Get the configuration this extractor was built with
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract a record from one trace line
    ///
    /// # Arguments
    /// * `line` - Raw trace line
    /// * `sequence_index` - Position of the line in the trace
    ///
    /// # Returns
    /// * `Some(EventRecord)` for a lifecycle line with a resolvable handle
    /// * `None` for every other line
    pub fn extract(&self, line: &str, sequence_index: usize) -> Option<EventRecord> {
        if !self.config.should_process_line(line) {
            return None;
        }

        let (handle, op) = self.match_lifecycle(line)?;

        if self.config.drop_null_handles && handle.is_null() {
            log::trace!("Dropping null handle on line {}", sequence_index);
            return None;
        }

        Some(EventRecord {
            handle,
            op,
            timestamp: line.split_whitespace().next().and_then(parse_timestamp),
            thread_id: self.capture(&self.thread_id, line),
            sequence_index,
        })
    }

    /// Find the operation and handle a line describes
    fn match_lifecycle(&self, line: &str) -> Option<(EventHandle, EventOp)> {
        for kind in EventKind::ALL {
            let matched = self
                .config
                .markers
                .for_kind(kind)
                .iter()
                .any(|marker| !marker.is_empty() && line.contains(marker.as_str()));
            if !matched {
                continue;
            }

            let pattern = match kind {
                EventKind::Create => &self.created_handle,
                _ => &self.event_handle,
            };
            // Marker without a handle: the line is unrecognized
            let handle = self.capture(pattern, line)?;
            return Some((EventHandle::new(handle), plain_op(kind)));
        }

        // Append operations signal an event once their wait-list is satisfied
        let handle = self.capture(&self.signal_handle, line)?;
        Some((
            EventHandle::new(handle),
            EventOp::Signal {
                depends_on: self.parse_wait_list(line),
            },
        ))
    }

    /// Parse `phWaitEvents_vals: [ 0x..., 0x... ]` into handles
    pub fn parse_wait_list(&self, line: &str) -> Vec<EventHandle> {
        let Some(list) = self.capture(&self.wait_list, line) else {
            return Vec::new();
        };

        list.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(EventHandle::from)
            .filter(|handle| !(self.config.drop_null_handles && handle.is_null()))
            .collect()
    }

    fn capture(&self, pattern: &Regex, line: &str) -> Option<String> {
        pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Operation for a kind recognized by marker alone
fn plain_op(kind: EventKind) -> EventOp {
    match kind {
        EventKind::Create => EventOp::Create,
        EventKind::Reset => EventOp::Reset,
        EventKind::Query => EventOp::Query,
        EventKind::Wait => EventOp::Wait,
        EventKind::Signal => EventOp::Signal {
            depends_on: Vec::new(),
        },
        EventKind::Destroy => EventOp::Destroy,
    }
}

/// Parse an `HH:MM:SS.fraction` field into seconds of day
///
/// Returns `None` unless the field has exactly three colon-separated
/// components forming a valid time of day. Traces are assumed not to cross
/// midnight, so no date context is applied.
pub fn parse_timestamp(field: &str) -> Option<SecondsOfDay> {
    if field.split(':').count() != 3 {
        return None;
    }

    let time = NaiveTime::parse_from_str(field, "%H:%M:%S%.f").ok()?;
    Some(time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9)
}
