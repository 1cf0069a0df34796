//! Report writers for scan results.
//!
//! - [`text`]: the human-readable report, optionally colored
//! - [`json`]: one JSON document for tooling
//! - [`csv`]: one row per occurrence for spreadsheets
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use codedupe::cli::OutputFormat;
//! use codedupe::detect::DuplicateFinder;
//! use codedupe::error::ExitCode;
//! use codedupe::output::write_report;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.find_duplicates(&[PathBuf::from("src")]).unwrap();
//! let exit_code = ExitCode::for_scan(groups.len(), summary.has_errors());
//!
//! let mut stdout = std::io::stdout().lock();
//! write_report(&mut stdout, OutputFormat::Json, &groups, &summary, exit_code, false).unwrap();
//! ```

pub mod csv;
pub mod json;
pub mod text;

use std::io::{self, Write};

use thiserror::Error;

use crate::cli::OutputFormat;
use crate::detect::{MatchGroup, ScanSummary};
use crate::error::ExitCode;

pub use self::csv::CsvOutput;
pub use self::json::JsonOutput;
pub use self::text::{write_languages, TextOutput};

/// Errors that can occur while writing a report.
#[derive(Debug, Error)]
pub enum OutputError {
    /// I/O error during writing.
    #[error("I/O error while writing report: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Write `groups` to `writer` in the requested format.
///
/// `use_color` only affects the text format.
///
/// # Errors
///
/// Returns `OutputError` if serialization or writing fails.
pub fn write_report<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    groups: &[MatchGroup],
    summary: &ScanSummary,
    exit_code: ExitCode,
    use_color: bool,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Text => TextOutput::new(groups, summary)
            .with_color(use_color)
            .write_to(writer),
        OutputFormat::Json => JsonOutput::new(groups, summary, exit_code).write_to(writer, true),
        OutputFormat::Csv => CsvOutput::new(groups).write_to(writer),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::detect::{ContentDigest, MatchGroup, Occurrence, ScanSummary};
    use crate::tokens::FileId;

    pub fn occurrence(file: u32, path: &str, start_line: u32, line_count: u32) -> Occurrence {
        Occurrence {
            file: FileId(file),
            path: Arc::from(Path::new(path)),
            start_token: start_line * 10,
            start_line,
            line_count,
        }
    }

    pub fn sample_groups() -> Vec<MatchGroup> {
        vec![
            MatchGroup::with_occurrences(
                ContentDigest([0xab; 20]),
                120,
                [occurrence(0, "src/a.c", 6, 12), occurrence(1, "src/b.c", 40, 12)],
            ),
            MatchGroup::with_occurrences(
                ContentDigest([0x01; 20]),
                100,
                [
                    occurrence(2, "lib/x.py", 3, 5),
                    occurrence(2, "lib/x.py", 30, 5),
                    occurrence(3, "lib/y,z.py", 9, 4),
                ],
            ),
        ]
    }

    pub fn sample_summary() -> ScanSummary {
        ScanSummary {
            total_files: 5,
            unsupported_files: 1,
            tokenized_files: 4,
            total_tokens: 2_000,
            total_bytes: 4_096,
            duplicate_groups: 2,
            cross_file_groups: 2,
            duplicated_lines: 22,
            scan_duration: Duration::from_millis(1_234),
            ..Default::default()
        }
    }
}
