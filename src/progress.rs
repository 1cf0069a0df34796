//! Progress reporting utilities using indicatif.
//!
//! The driver reports three phases through [`ProgressCallback`]:
//!
//! - `walking`: file discovery (spinner, count only)
//! - `tokenize`: parallel lexing of every discovered file
//! - `match`: the sequential rolling-hash pass, one file at a time
//!
//! [`Progress`] renders them as indicatif bars on stderr. Quiet mode turns
//! every callback into a no-op.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress callback for duplicate detection phases.
///
/// Implement this trait to receive progress updates during a scan.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (`"walking"`, `"tokenize"`, `"match"`)
    /// * `total` - Total number of items to process (0 if unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    tokenize: Mutex<Option<ProgressBar>>,
    matching: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

fn slot(bar: &Mutex<Option<ProgressBar>>) -> MutexGuard<'_, Option<ProgressBar>> {
    bar.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use codedupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            walking: Mutex::new(None),
            tokenize: Mutex::new(None),
            matching: Mutex::new(None),
            quiet,
        }
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style(color: &str) -> ProgressStyle {
        let template = format!(
            "[{{elapsed_precise}}] [{{bar:40.{}/blue}}] {{pos}}/{{len}} ({{percent}}%) {{msg}}",
            color
        );
        ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
    }

    fn active(&self) -> Option<ProgressBar> {
        [&self.matching, &self.tokenize, &self.walking]
            .into_iter()
            .find_map(|bar| slot(bar).clone())
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            "walking" => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::walking_style());
                pb.set_message("Walking");
                pb.enable_steady_tick(Duration::from_millis(100));
                *slot(&self.walking) = Some(pb);
            }
            "tokenize" => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style("cyan"));
                pb.set_message("Tokenizing");
                *slot(&self.tokenize) = Some(pb);
            }
            "match" => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::bar_style("green"));
                pb.set_message("Matching");
                *slot(&self.matching) = Some(pb);
            }
            other => log::debug!("Unknown progress phase: {}", other),
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = slot(&self.matching).as_ref() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 30));
        } else if let Some(pb) = slot(&self.tokenize).as_ref() {
            // Tokenizing runs in parallel, so positions arrive out of order
            pb.inc(1);
            pb.set_message(truncate_path(path, 30));
        } else if let Some(pb) = slot(&self.walking).as_ref() {
            pb.set_position(current as u64);
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let (bar, message) = match phase {
            "walking" => (&self.walking, "Walking complete"),
            "tokenize" => (&self.tokenize, "Tokenizing complete"),
            "match" => (&self.matching, "Matching complete"),
            _ => return,
        };
        if let Some(pb) = slot(bar).take() {
            pb.finish_with_message(message);
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active() {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.len() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if file_name.len() >= max_len {
        let tail: String = file_name
            .chars()
            .rev()
            .take(max_len.saturating_sub(3))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_path_unchanged() {
        assert_eq!(truncate_path("src/a.c", 30), "src/a.c");
    }

    #[test]
    fn test_truncate_keeps_file_name() {
        let path = "/very/long/directory/structure/for/testing/main.rs";
        assert_eq!(truncate_path(path, 30), ".../main.rs");
    }

    #[test]
    fn test_truncate_long_file_name() {
        let name = "a_really_long_generated_file_name_for_tests.rs";
        let out = truncate_path(name, 20);
        assert!(out.starts_with("..."));
        assert!(out.ends_with("tests.rs"));
        assert_eq!(out.chars().count(), 20);
    }

    #[test]
    fn test_quiet_progress_ignores_everything() {
        let progress = Progress::new(true);
        progress.on_phase_start("tokenize", 10);
        progress.on_progress(1, "a.c");
        progress.on_message("hello");
        progress.on_phase_end("tokenize");
        assert!(slot(&progress.tokenize).is_none());
    }

    #[test]
    fn test_phase_bars_are_created_and_finished() {
        let progress = Progress::new(false);
        progress.on_phase_start("match", 2);
        assert!(slot(&progress.matching).is_some());
        progress.on_progress(1, "a.c");
        progress.on_phase_end("match");
        assert!(slot(&progress.matching).is_none());
    }
}
