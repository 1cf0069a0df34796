//! CSV report for spreadsheets and data analysis.
//!
//! One row is generated for each occurrence of each duplicated block.
//!
//! # Columns
//!
//! - `group_id`: 1-based rank of the block in the report
//! - `digest`: SHA-1 content digest (hexadecimal)
//! - `file`: Path of the file holding this copy
//! - `start_line`: First line of this copy
//! - `line_count`: Lines spanned by this copy
//! - `matched_lines`: Largest line span across the block's copies
//! - `tokens`: Block length in tokens

use std::io;

use serde::Serialize;

use super::OutputError;
use crate::detect::MatchGroup;

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    digest: &'a str,
    file: String,
    start_line: u32,
    line_count: u32,
    matched_lines: u32,
    tokens: usize,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [MatchGroup],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [MatchGroup]) -> Self {
        Self { groups }
    }

    /// Write the CSV output to the given writer.
    ///
    /// The header row is written even when there are no groups.
    ///
    /// # Errors
    ///
    /// Returns `OutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), OutputError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record([
            "group_id",
            "digest",
            "file",
            "start_line",
            "line_count",
            "matched_lines",
            "tokens",
        ])?;

        for (idx, group) in self.groups.iter().enumerate() {
            let digest = group.digest.to_hex();
            let matched_lines = group.matched_lines();

            for occurrence in &group.occurrences {
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    digest: &digest,
                    file: occurrence.path.to_string_lossy().into_owned(),
                    start_line: occurrence.start_line,
                    line_count: occurrence.line_count,
                    matched_lines,
                    tokens: group.token_len,
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `OutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, OutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::test_support::*;

    #[test]
    fn test_csv_output_rows() {
        let csv_str = CsvOutput::new(&sample_groups()).to_string().unwrap();
        let lines: Vec<&str> = csv_str.lines().collect();

        assert_eq!(
            lines[0],
            "group_id,digest,file,start_line,line_count,matched_lines,tokens"
        );
        // Two occurrences in the first group, three in the second
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], format!("1,{},src/a.c,6,12,12,120", "ab".repeat(20)));
        assert!(lines[3].starts_with("2,"));
        assert!(lines[3].contains("lib/x.py,3,5,5,100"));
    }

    #[test]
    fn test_csv_output_quoting() {
        let csv_str = CsvOutput::new(&sample_groups()).to_string().unwrap();
        assert!(csv_str.contains("\"lib/y,z.py\""));
    }

    #[test]
    fn test_csv_output_empty_has_header() {
        let csv_str = CsvOutput::new(&[]).to_string().unwrap();
        assert_eq!(csv_str.lines().count(), 1);
        assert!(csv_str.starts_with("group_id,"));
    }
}
