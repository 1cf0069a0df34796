//! JSON report for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2026-01-01T12:00:00Z",
//!   "duplicates": [
//!     {
//!       "matched_lines": 12,
//!       "tokens": 120,
//!       "digest": "abab...",
//!       "occurrences": [
//!         { "file": "src/a.c", "start_line": 6, "line_count": 12 },
//!         { "file": "src/b.c", "start_line": 40, "line_count": 12 }
//!       ]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 5,
//!     "duplicate_groups": 1,
//!     "duplicated_lines": 12,
//!     "scan_duration_ms": 1234,
//!     "exit_code": 0,
//!     "exit_code_name": "CD000"
//!   }
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::OutputError;
use crate::detect::{MatchGroup, Occurrence, ScanSummary};
use crate::error::ExitCode;

/// One occurrence of a duplicated block.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOccurrence {
    /// Path as discovered by the walk
    pub file: String,
    /// First line of the block (1-based)
    pub start_line: u32,
    /// Lines spanned by this copy
    pub line_count: u32,
}

impl From<&Occurrence> for JsonOccurrence {
    fn from(occurrence: &Occurrence) -> Self {
        Self {
            file: occurrence.path.to_string_lossy().into_owned(),
            start_line: occurrence.start_line,
            line_count: occurrence.line_count,
        }
    }
}

/// A duplicated block in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMatchGroup {
    /// Largest line span across occurrences
    pub matched_lines: u32,
    /// Block length in tokens
    pub tokens: usize,
    /// SHA-1 content digest (40 hex characters)
    pub digest: String,
    /// Every copy of the block
    pub occurrences: Vec<JsonOccurrence>,
}

impl JsonMatchGroup {
    /// Create a JSON group from a `MatchGroup`.
    #[must_use]
    pub fn from_match_group(group: &MatchGroup) -> Self {
        Self {
            matched_lines: group.matched_lines(),
            tokens: group.token_len,
            digest: group.digest.to_hex(),
            occurrences: group.occurrences.iter().map(JsonOccurrence::from).collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Files found by the walk
    pub total_files: usize,
    /// Files without a registered language
    pub unsupported_files: usize,
    /// Files tokenized and scanned
    pub tokenized_files: usize,
    /// Files skipped because of errors
    pub skipped_files: usize,
    /// Tokens across scanned files
    pub total_tokens: usize,
    /// Bytes across scanned files
    pub total_bytes: u64,
    /// Windows added to the hash index
    pub windows_indexed: usize,
    /// Hash candidates that failed verification or were too short
    pub rejected_candidates: usize,
    /// Reported duplicate groups
    pub duplicate_groups: usize,
    /// Groups spanning more than one file
    pub cross_file_groups: usize,
    /// Lines removable by keeping one copy of each block
    pub duplicated_lines: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Messages for files that could not be walked or tokenized
    pub errors: Vec<String>,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "CD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a `ScanSummary` and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        let matcher = &summary.matcher;
        Self {
            total_files: summary.total_files,
            unsupported_files: summary.unsupported_files,
            tokenized_files: summary.tokenized_files,
            skipped_files: summary.skipped_files,
            total_tokens: summary.total_tokens,
            total_bytes: summary.total_bytes,
            windows_indexed: summary.windows_indexed,
            rejected_candidates: matcher.guard_rejections + matcher.short_extensions,
            duplicate_groups: summary.duplicate_groups,
            cross_file_groups: summary.cross_file_groups,
            duplicated_lines: summary.duplicated_lines,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            errors: summary
                .scan_errors
                .iter()
                .map(ToString::to_string)
                .chain(summary.token_errors.iter().map(ToString::to_string))
                .collect(),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// When the report was produced (RFC 3339, UTC)
    pub generated_at: DateTime<Utc>,
    /// Duplicated blocks, largest first
    pub duplicates: Vec<JsonMatchGroup>,
    /// Scan summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from groups, summary and exit code.
    ///
    /// # Example
    ///
    /// ```
    /// use codedupe::detect::ScanSummary;
    /// use codedupe::error::ExitCode;
    /// use codedupe::output::json::JsonOutput;
    ///
    /// let output = JsonOutput::new(&[], &ScanSummary::default(), ExitCode::NoDuplicates);
    /// assert!(output.duplicates.is_empty());
    /// assert_eq!(output.summary.exit_code_name, "CD002");
    /// ```
    #[must_use]
    pub fn new(groups: &[MatchGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            generated_at: Utc::now(),
            duplicates: groups.iter().map(JsonMatchGroup::from_match_group).collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), OutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}
