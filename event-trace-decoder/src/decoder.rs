//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The TraceDecoder reads a text trace line by line, hands every line to the
//! record extractor, and collects the lifecycle records in trace order.

use crate::config::ExtractorConfig;
use crate::extractor::RecordExtractor;
use crate::registry::IdentityRegistry;
use crate::types::{EventRecord, Result, TraceError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// The main decoder struct - entry point for reading traces
pub struct TraceDecoder {
    extractor: RecordExtractor,
}

impl TraceDecoder {
    /// Create a new decoder with the given extractor configuration
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        Ok(Self {
            extractor: RecordExtractor::new(config)?,
        })
    }

    /// Get the underlying record extractor
    pub fn extractor(&self) -> &RecordExtractor {
        &self.extractor
    }

    /// Decode a trace file into lifecycle records
    ///
    /// # Arguments
    /// * `path` - Path to the text trace
    ///
    /// # Returns
    /// * `Result<Vec<EventRecord>>` - Records in trace order, or
    ///   `TraceError::UnreadableTrace` if the file cannot be opened or read
    ///
    /// # Example
    /// ```no_run
    /// use event_trace_decoder::{ExtractorConfig, TraceDecoder};
    /// use std::path::Path;
    ///
    /// let decoder = TraceDecoder::new(ExtractorConfig::default()).unwrap();
    /// let records = decoder.decode_file(Path::new("trace.txt")).unwrap();
    /// println!("{} lifecycle records", records.len());
    /// ```
    pub fn decode_file(&self, path: &Path) -> Result<Vec<EventRecord>> {
        log::info!("Decoding trace file: {:?}", path);

        let file = File::open(path).map_err(|source| TraceError::UnreadableTrace {
            path: path.to_path_buf(),
            source,
        })?;

        let records = self
            .decode_reader(BufReader::new(file))
            .map_err(|e| match e {
                TraceError::IoError(source) => TraceError::UnreadableTrace {
                    path: path.to_path_buf(),
                    source,
                },
                other => other,
            })?;

        log::info!("Decoded {} lifecycle records from {:?}", records.len(), path);
        Ok(records)
    }

    /// Decode records from any buffered reader
    ///
    /// Lines that are not valid UTF-8 are decoded lossily; they are still
    /// counted so that sequence indices keep matching line numbers.
    pub fn decode_reader<R: BufRead>(&self, mut reader: R) -> Result<Vec<EventRecord>> {
        let mut records = Vec::new();
        let mut buffer = Vec::new();
        let mut line_idx = 0;

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buffer);
            if let Some(record) = self.extractor.extract(line.trim_end(), line_idx) {
                log::trace!("Line {}: {} {}", line_idx, record.kind(), record.handle);
                records.push(record);
            }
            line_idx += 1;
        }

        log::debug!("Scanned {} lines, kept {} records", line_idx, records.len());
        Ok(records)
    }

    /// Decode records from lines already in memory
    pub fn decode_lines<I, S>(&self, lines: I) -> Vec<EventRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .enumerate()
            .filter_map(|(idx, line)| self.extractor.extract(line.as_ref(), idx))
            .collect()
    }

    /// Decode a trace file and build the identity registry from it
    pub fn load_registry(&self, path: &Path) -> Result<IdentityRegistry> {
        let records = self.decode_file(path)?;
        Ok(IdentityRegistry::build(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind;

    #[test]
    fn test_missing_file_is_unreadable() {
        let decoder = TraceDecoder::new(ExtractorConfig::default()).unwrap();
        let result = decoder.decode_file(Path::new("/nonexistent/trace.txt"));
        assert!(matches!(result, Err(TraceError::UnreadableTrace { .. })));
    }

    #[test]
    fn test_decode_lines_keeps_line_positions() {
        let decoder = TraceDecoder::new(ExtractorConfig::default()).unwrap();
        let lines = [
            "08:00:00.100 - app - vpid: 1, vtid: 1 - lttng_ust_ze:zeInit_entry: { flags: 0 }",
            "08:00:00.200 - app - vpid: 1, vtid: 1 - lttng_ust_ze:zeEventCreate_exit: { zeResult: ZE_RESULT_SUCCESS, phEvent_val: 0xa }",
            "not a trace line",
            "08:00:00.300 - app - vpid: 1, vtid: 2 - lttng_ust_ze:zeEventHostSignal_entry: { hEvent: 0xa }",
        ];

        let records = decoder.decode_lines(lines);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence_index, 1);
        assert_eq!(records[1].sequence_index, 3);
        assert_eq!(records[1].kind(), EventKind::Signal);
    }

    #[test]
    fn test_decode_reader_handles_invalid_utf8() {
        let decoder = TraceDecoder::new(ExtractorConfig::default()).unwrap();
        let mut bytes = b"\xff\xfe junk\n".to_vec();
        bytes.extend_from_slice(
            b"08:00:00.300 - app - vpid: 1, vtid: 2 - lttng_ust_ze:zeEventHostReset_entry: { hEvent: 0xa }\n",
        );

        let records = decoder.decode_reader(bytes.as_slice()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sequence_index, 1);
    }
}
