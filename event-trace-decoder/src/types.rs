//! Core types for the event trace decoder library
//!
//! This module defines the records the extractor emits for every recognized
//! lifecycle line, the identity of a synchronization event, and the error type
//! shared by the registry and the traversal engine.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::PathBuf;

/// Seconds since midnight, as parsed from the `HH:MM:SS.fraction` field
pub type SecondsOfDay = f64;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, TraceError>;

/// Errors raised while reading a trace or answering a query
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("Unknown event handle: {0}")]
    UnknownHandle(EventHandle),

    #[error("Circular dependency detected at event handle {0}")]
    CircularDependency(EventHandle),

    #[error("Failed to read trace file {path:?}: {source}")]
    UnreadableTrace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid line pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Opaque identity of a synchronization event (usually a pointer like `0x0000556c1d012d80`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventHandle(String);

impl EventHandle {
    /// Create a handle from its textual form
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The handle as it appeared in the trace
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for a zero pointer (`0x0`, `0x0000000000000000`)
    pub fn is_null(&self) -> bool {
        let digits = self
            .0
            .strip_prefix("0x")
            .or_else(|| self.0.strip_prefix("0X"))
            .unwrap_or(&self.0);
        !digits.is_empty() && digits.chars().all(|c| c == '0')
    }
}

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventHandle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EventHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for EventHandle {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle operation kinds recognized in a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Create,
    Reset,
    Query,
    /// Blocking host-side synchronize on the event
    Wait,
    Signal,
    Destroy,
}

impl EventKind {
    /// All kinds, in the order the extractor tests their markers
    pub const ALL: [EventKind; 6] = [
        EventKind::Create,
        EventKind::Destroy,
        EventKind::Reset,
        EventKind::Query,
        EventKind::Wait,
        EventKind::Signal,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so width specifiers in reports apply
        f.pad(match self {
            EventKind::Create => "CREATE",
            EventKind::Reset => "RESET",
            EventKind::Query => "QUERY",
            EventKind::Wait => "WAIT",
            EventKind::Signal => "SIGNAL",
            EventKind::Destroy => "DESTROY",
        })
    }
}

/// The operation a record describes
///
/// Only a signal carries a wait-list, so a `Create` with dependencies cannot
/// be represented.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOp {
    Create,
    Reset,
    Query,
    Wait,
    Signal {
        /// Events that had to be satisfied before this signal could fire
        depends_on: Vec<EventHandle>,
    },
    Destroy,
}

impl EventOp {
    /// The fieldless kind of this operation
    pub fn kind(&self) -> EventKind {
        match self {
            EventOp::Create => EventKind::Create,
            EventOp::Reset => EventKind::Reset,
            EventOp::Query => EventKind::Query,
            EventOp::Wait => EventKind::Wait,
            EventOp::Signal { .. } => EventKind::Signal,
            EventOp::Destroy => EventKind::Destroy,
        }
    }

    /// Wait-list of a signal; empty for every other operation
    pub fn depends_on(&self) -> &[EventHandle] {
        match self {
            EventOp::Signal { depends_on } => depends_on,
            _ => &[],
        }
    }
}

/// One recognized lifecycle line of a trace
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Event the line operates on
    pub handle: EventHandle,
    /// What happened to the event
    pub op: EventOp,
    /// Seconds of day, `None` when the time field was not `HH:MM:SS.fraction`
    pub timestamp: Option<SecondsOfDay>,
    /// Originating thread (`vtid`), if present in the line
    pub thread_id: Option<String>,
    /// Position of the line in the trace (0-based)
    pub sequence_index: usize,
}

/// Deduplication key of a record within one traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey<'a> {
    pub handle: &'a EventHandle,
    pub kind: EventKind,
    pub sequence_index: usize,
}

impl EventRecord {
    /// Get the kind of this record
    pub fn kind(&self) -> EventKind {
        self.op.kind()
    }

    /// Get the wait-list of this record (empty unless it is a signal)
    pub fn depends_on(&self) -> &[EventHandle] {
        self.op.depends_on()
    }

    /// Key used to suppress duplicates during traversal
    pub fn key(&self) -> RecordKey<'_> {
        RecordKey {
            handle: &self.handle,
            kind: self.kind(),
            sequence_index: self.sequence_index,
        }
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} {} {}",
            format_time_of_day(self.timestamp),
            self.sequence_index,
            self.kind(),
            self.handle
        )?;
        if let EventOp::Signal { depends_on } = &self.op {
            if !depends_on.is_empty() {
                let list: Vec<&str> = depends_on.iter().map(EventHandle::as_str).collect();
                write!(f, " waits on [{}]", list.join(", "))?;
            }
        }
        Ok(())
    }
}

/// Render seconds-of-day as `HH:MM:SS.nnnnnnnnn` (`--:--:--` when absent)
pub fn format_time_of_day(timestamp: Option<SecondsOfDay>) -> String {
    let Some(seconds) = timestamp else {
        return "--:--:--".to_string();
    };

    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0);
    if whole < 0.0 || whole > u32::MAX as f64 {
        return format!("{:.9}", seconds);
    }

    match NaiveTime::from_num_seconds_from_midnight_opt(whole as u32, nanos as u32) {
        Some(time) => time.format("%H:%M:%S%.9f").to_string(),
        None => format!("{:.9}", seconds),
    }
}
