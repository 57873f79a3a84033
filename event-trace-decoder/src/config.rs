//! Extractor configuration types
//!
//! This module defines the marker substrings the extractor uses to recognize
//! lifecycle lines. The defaults match the Level Zero LTTng tracepoints; every
//! list can be overridden from the application's config file.

use crate::types::EventKind;
use serde::{Deserialize, Serialize};

/// Configuration for the record extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Markers for lifecycle lines, one list per kind
    #[serde(default)]
    pub markers: MarkerConfig,

    /// Lines containing any of these substrings are skipped before extraction
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Treat zero pointers as unresolvable handles
    #[serde(default = "default_true")]
    pub drop_null_handles: bool,
}

/// Marker substrings per lifecycle kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_create_markers")]
    pub create: Vec<String>,
    #[serde(default = "default_destroy_markers")]
    pub destroy: Vec<String>,
    #[serde(default = "default_reset_markers")]
    pub reset: Vec<String>,
    #[serde(default = "default_query_markers")]
    pub query: Vec<String>,
    #[serde(default = "default_wait_markers")]
    pub wait: Vec<String>,
    /// Host-side signals (no wait-list)
    #[serde(default = "default_signal_markers")]
    pub signal: Vec<String>,
    /// Field naming the signal event of an append operation that carries a wait-list
    #[serde(default = "default_signal_field")]
    pub signal_field: String,
}

fn default_true() -> bool {
    true
}

fn default_ignore_patterns() -> Vec<String> {
    vec!["event_profiling".to_string()]
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_create_markers() -> Vec<String> {
    strings(&["zeEventCreate_exit"])
}

fn default_destroy_markers() -> Vec<String> {
    strings(&["zeEventDestroy_entry"])
}

fn default_reset_markers() -> Vec<String> {
    strings(&["zeEventHostReset_entry", "zeCommandListAppendEventReset_entry"])
}

fn default_query_markers() -> Vec<String> {
    strings(&["zeEventQueryStatus_entry"])
}

fn default_wait_markers() -> Vec<String> {
    strings(&["zeEventHostSynchronize_entry"])
}

fn default_signal_markers() -> Vec<String> {
    strings(&["zeEventHostSignal_entry", "zeCommandListAppendSignalEvent_entry"])
}

fn default_signal_field() -> String {
    "hSignalEvent".to_string()
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            create: default_create_markers(),
            destroy: default_destroy_markers(),
            reset: default_reset_markers(),
            query: default_query_markers(),
            wait: default_wait_markers(),
            signal: default_signal_markers(),
            signal_field: default_signal_field(),
        }
    }
}

impl MarkerConfig {
    /// Markers registered for a kind
    pub fn for_kind(&self, kind: EventKind) -> &[String] {
        match kind {
            EventKind::Create => &self.create,
            EventKind::Destroy => &self.destroy,
            EventKind::Reset => &self.reset,
            EventKind::Query => &self.query,
            EventKind::Wait => &self.wait,
            EventKind::Signal => &self.signal,
        }
    }

    fn for_kind_mut(&mut self, kind: EventKind) -> &mut Vec<String> {
        match kind {
            EventKind::Create => &mut self.create,
            EventKind::Destroy => &mut self.destroy,
            EventKind::Reset => &mut self.reset,
            EventKind::Query => &mut self.query,
            EventKind::Wait => &mut self.wait,
            EventKind::Signal => &mut self.signal,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            markers: MarkerConfig::default(),
            ignore_patterns: default_ignore_patterns(),
            drop_null_handles: true,
        }
    }
}

impl ExtractorConfig {
    /// Create a new extractor configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a marker for a kind
    pub fn add_marker(mut self, kind: EventKind, marker: impl Into<String>) -> Self {
        self.markers.for_kind_mut(kind).push(marker.into());
        self
    }

    /// Builder method: add an ignore pattern
    pub fn add_ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_patterns.push(pattern.into());
        self
    }

    /// Builder method: enable or disable dropping of zero-pointer handles
    pub fn with_null_handles_dropped(mut self, enabled: bool) -> Self {
        self.drop_null_handles = enabled;
        self
    }

    /// Check if a line should be handed to the extractor
    pub fn should_process_line(&self, line: &str) -> bool {
        !self.ignore_patterns.iter().any(|p| line.contains(p.as_str()))
    }
}
