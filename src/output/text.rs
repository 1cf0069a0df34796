//! Human-readable report.
//!
//! ```text
//! ==================================================
//! Match 1:
//! Found an approx. 12 line duplication in 2 files.
//! Starting at line 6 of src/a.c
//! Starting at line 40 of src/b.c
//! ==================================================
//! 1 duplicate block (12 duplicated lines) in 4 of 5 files, 2000 tokens, 4.0 KiB, 1.23s
//! ```

use std::io::Write;

use yansi::{Color, Paint, Style};

use super::OutputError;
use crate::detect::{MatchGroup, ScanSummary};
use crate::tokens::lexer::LanguageSpec;

const SEPARATOR_WIDTH: usize = 50;

/// Text report formatter.
pub struct TextOutput<'a> {
    groups: &'a [MatchGroup],
    summary: &'a ScanSummary,
    use_color: bool,
}

impl<'a> TextOutput<'a> {
    /// Create a plain (uncolored) text formatter.
    #[must_use]
    pub fn new(groups: &'a [MatchGroup], summary: &'a ScanSummary) -> Self {
        Self {
            groups,
            summary,
            use_color: false,
        }
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.use_color {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::Io` if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), OutputError> {
        let separator = "=".repeat(SEPARATOR_WIDTH);
        let heading = Style::new().bold();
        let location = Style::new().fg(Color::Cyan);

        for (idx, group) in self.groups.iter().enumerate() {
            writeln!(writer, "{}", self.paint(&separator, Style::new().dim()))?;
            writeln!(writer, "{}", self.paint(&format!("Match {}:", idx + 1), heading))?;
            writeln!(
                writer,
                "Found an approx. {} line duplication in {} files.",
                group.matched_lines(),
                group.len()
            )?;
            for occurrence in &group.occurrences {
                writeln!(
                    writer,
                    "Starting at line {} of {}",
                    occurrence.start_line,
                    self.paint(&occurrence.path.display().to_string(), location)
                )?;
            }
        }
        if !self.groups.is_empty() {
            writeln!(writer, "{}", self.paint(&separator, Style::new().dim()))?;
        }

        writeln!(writer, "{}", self.summary_line())?;
        let warning = Style::new().fg(Color::Yellow);
        let errors = self
            .summary
            .scan_errors
            .iter()
            .map(ToString::to_string)
            .chain(self.summary.token_errors.iter().map(ToString::to_string));
        for err in errors {
            writeln!(writer, "{}", self.paint(&format!("warning: {}", err), warning))?;
        }
        Ok(())
    }

    fn summary_line(&self) -> String {
        let s = self.summary;
        let blocks = match s.duplicate_groups {
            0 => "No duplicate blocks".to_string(),
            1 => "1 duplicate block".to_string(),
            n => format!("{} duplicate blocks", n),
        };
        let text = format!(
            "{} ({} duplicated lines) in {} of {} files, {} tokens, {}, {:.2}s",
            blocks,
            s.duplicated_lines,
            s.tokenized_files,
            s.total_files,
            s.total_tokens,
            s.total_bytes_display(),
            s.scan_duration.as_secs_f64()
        );
        let style = if s.duplicate_groups == 0 {
            Style::new().fg(Color::Green).bold()
        } else {
            Style::new().fg(Color::Yellow).bold()
        };
        self.paint(&text, style)
    }
}

/// List languages and their extensions, one per line.
///
/// # Errors
///
/// Returns `OutputError::Io` if writing fails.
pub fn write_languages<W: Write>(
    writer: &mut W,
    languages: &[LanguageSpec],
) -> Result<(), OutputError> {
    for language in languages {
        let extensions: Vec<String> = language
            .extensions
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect();
        writeln!(writer, "{:<12} {}", language.name, extensions.join(" "))?;
    }
    Ok(())
}
