//! Duplicate finder: the end-to-end detection pipeline.
//!
//! # Overview
//!
//! 1. **Walk** - Collect source files from every input path, then sort and
//!    dedupe them so file ids follow path order
//! 2. **Tokenize** - Lex every file on a bounded rayon pool
//! 3. **Match** - Feed each file, in id order, through one rolling-matcher
//!    pass sharing a single [`MatchStore`]
//! 4. **Rank** - Report groups that pass the thresholds, largest first
//!
//! Tokenizing is pure per-file work and runs in parallel. Matching is
//! strictly sequential: a window may only be compared with windows indexed
//! before it, so every earlier file must be fully indexed first.
//!
//! # Example
//!
//! ```no_run
//! use codedupe::detect::{DuplicateFinder, FinderConfig};
//! use std::path::PathBuf;
//!
//! let config = FinderConfig::default().with_min_tokens(50).with_io_threads(4);
//! let finder = DuplicateFinder::new(config);
//!
//! let (groups, summary) = finder.find_duplicates(&[PathBuf::from("src")]).unwrap();
//! println!("Found {} duplicate blocks", groups.len());
//! println!("Duplicated lines: {}", summary.duplicated_lines);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;

use super::matcher::{MatcherStats, RollingMatcher};
use super::store::{MatchGroup, MatchStore};
use super::EngineError;
use crate::progress::ProgressCallback;
use crate::scanner::{ScanError, Walker, WalkerConfig};
use crate::tokens::{FileId, LexerRegistry, TokenCache, TokenError};

/// Default minimum match length in tokens.
pub const DEFAULT_MIN_TOKENS: usize = 100;
/// Default minimum match length in lines.
pub const DEFAULT_MIN_LINES: u32 = 3;
/// Default size of the tokenizer pool.
pub const DEFAULT_IO_THREADS: usize = 4;

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Minimum match length in tokens (the rolling window size).
    pub min_tokens: usize,
    /// Minimum match length in lines.
    pub min_lines: u32,
    /// Replace identifiers and literals with placeholders before matching.
    pub fuzzy: bool,
    /// Number of threads used for tokenizing.
    pub io_threads: usize,
    /// Fail on the first file that cannot be walked or tokenized.
    pub strict: bool,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("min_tokens", &self.min_tokens)
            .field("min_lines", &self.min_lines)
            .field("fuzzy", &self.fuzzy)
            .field("io_threads", &self.io_threads)
            .field("strict", &self.strict)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            min_tokens: DEFAULT_MIN_TOKENS,
            min_lines: DEFAULT_MIN_LINES,
            fuzzy: false,
            io_threads: DEFAULT_IO_THREADS,
            strict: false,
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the minimum match length in tokens.
    #[must_use]
    pub fn with_min_tokens(mut self, tokens: usize) -> Self {
        self.min_tokens = tokens;
        self
    }

    /// Set the minimum match length in lines.
    #[must_use]
    pub fn with_min_lines(mut self, lines: u32) -> Self {
        self.min_lines = lines;
        self
    }

    /// Enable fuzzy matching.
    #[must_use]
    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    /// Set the tokenizer thread count.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set fail-fast on any walk or tokenize error.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Reject configurations the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidConfig`] if `min_tokens` is zero, or
    /// [`FinderError::ScanError`] if a walker pattern does not compile.
    pub fn validate(&self) -> Result<(), FinderError> {
        if self.min_tokens == 0 {
            return Err(FinderError::InvalidConfig(EngineError::InvalidWindowSize(
                self.min_tokens,
            )));
        }
        self.walker_config.validate()?;
        Ok(())
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Source files with a lexer that entered the pipeline
    pub total_files: usize,
    /// Discovered files skipped because no lexer handles them
    pub unsupported_files: usize,
    /// Files tokenized and matched
    pub tokenized_files: usize,
    /// Files that failed to tokenize
    pub skipped_files: usize,
    /// Tokens fed through the matcher
    pub total_tokens: usize,
    /// Bytes of source read
    pub total_bytes: u64,
    /// Windows recorded in the bucket index
    pub windows_indexed: usize,
    /// Counters summed over every file pass
    pub matcher: MatcherStats,
    /// Reported duplicate groups
    pub duplicate_groups: usize,
    /// Reported groups with occurrences in more than one file
    pub cross_file_groups: usize,
    /// Lines removable by keeping one copy of every group
    pub duplicated_lines: u64,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Files that could not be tokenized
    pub token_errors: Vec<TokenError>,
    /// Errors encountered while walking
    pub scan_errors: Vec<ScanError>,
}

impl ScanSummary {
    /// Format total bytes as a human-readable string.
    #[must_use]
    pub fn total_bytes_display(&self) -> String {
        ByteSize(self.total_bytes).to_string()
    }

    /// Check if any file was skipped because of an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.token_errors.is_empty() || !self.scan_errors.is_empty()
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The configuration cannot be run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[source] EngineError),

    /// The matcher failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A file could not be tokenized (strict mode only).
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A walk error occurred (strict mode), or a pattern is invalid.
    #[error(transparent)]
    ScanError(#[from] ScanError),
}

/// Duplicate finder that orchestrates the detection pipeline.
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
    registry: LexerRegistry,
}

impl DuplicateFinder {
    /// Create a new finder using the built-in languages.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            registry: LexerRegistry::with_builtin_languages(),
        }
    }

    /// Create a new finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Replace the language registry.
    #[must_use]
    pub fn with_registry(mut self, registry: LexerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// The finder's configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Languages this finder can tokenize.
    #[must_use]
    pub fn registry(&self) -> &LexerRegistry {
        &self.registry
    }

    /// Find duplicated code under the given files and directories.
    ///
    /// # Returns
    ///
    /// Reported groups, largest first, and statistics about the scan.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The configuration is invalid
    /// - An input path does not exist
    /// - The scan is interrupted by shutdown signal
    /// - Strict mode is on and any file cannot be walked or tokenized
    pub fn find_duplicates(
        &self,
        paths: &[PathBuf],
    ) -> Result<(Vec<MatchGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        self.config.validate()?;

        for path in paths {
            if !path.exists() {
                return Err(FinderError::PathNotFound(path.clone()));
            }
        }
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let mut summary = ScanSummary::default();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("walking", 0);
        }

        let mut files = Vec::new();
        for root in paths {
            log::info!("Walking {}", root.display());
            let mut walker = Walker::new(root, self.config.walker_config.clone());
            if let Some(ref flag) = self.config.shutdown_flag {
                walker = walker.with_shutdown_flag(flag.clone());
            }
            if let Some(ref callback) = self.config.progress_callback {
                walker = walker.with_progress_callback(callback.clone());
            }

            for result in walker.walk() {
                match result {
                    Ok(entry) => files.push(entry.path),
                    Err(e) if self.config.strict => return Err(FinderError::ScanError(e)),
                    Err(e) => summary.scan_errors.push(e),
                }
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("walking");
        }
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        self.run(files, summary, start_time)
    }

    /// Find duplicated code in an explicit list of files.
    ///
    /// Files are deduplicated and processed in path order; files without a
    /// lexer are counted and skipped.
    ///
    /// # Errors
    ///
    /// Same as [`DuplicateFinder::find_duplicates`], without the walk.
    pub fn find_in_files(
        &self,
        files: Vec<PathBuf>,
    ) -> Result<(Vec<MatchGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        self.config.validate()?;
        self.run(files, ScanSummary::default(), start_time)
    }

    fn run(
        &self,
        mut files: Vec<PathBuf>,
        mut summary: ScanSummary,
        start_time: Instant,
    ) -> Result<(Vec<MatchGroup>, ScanSummary), FinderError> {
        files.sort();
        files.dedup();

        let (supported, unsupported): (Vec<PathBuf>, Vec<PathBuf>) = files
            .into_iter()
            .partition(|p| self.registry.supports(p));
        summary.total_files = supported.len();
        summary.unsupported_files = unsupported.len();
        for path in &unsupported {
            log::trace!("No lexer for {}", path.display());
        }

        log::info!(
            "Found {} source files ({} without a lexer skipped)",
            summary.total_files,
            summary.unsupported_files
        );

        if supported.is_empty() {
            summary.scan_duration = start_time.elapsed();
            return Ok((Vec::new(), summary));
        }

        let mut cache = TokenCache::new(self.registry.clone(), self.config.fuzzy);
        let ids: Vec<FileId> = supported.iter().map(|p| cache.register(p)).collect();

        let failures = cache.warm(
            &ids,
            self.config.io_threads,
            self.config.progress_callback.as_ref(),
        );
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let failed: HashSet<FileId> = failures.iter().map(|(id, _)| *id).collect();
        if self.config.strict {
            if let Some((_, e)) = failures.into_iter().next() {
                return Err(FinderError::Token(e));
            }
        } else {
            summary.skipped_files = failures.len();
            summary
                .token_errors
                .extend(failures.into_iter().map(|(_, e)| e));
        }

        let scan_ids: Vec<FileId> = ids.into_iter().filter(|id| !failed.contains(id)).collect();
        let mut store = MatchStore::new(self.config.min_tokens, self.config.min_lines)?;
        let mut matcher = RollingMatcher::new(self.config.min_tokens)?;

        log::info!(
            "Matching {} files with a {}-token window",
            scan_ids.len(),
            self.config.min_tokens
        );
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("match", scan_ids.len());
        }

        for (idx, id) in scan_ids.iter().enumerate() {
            if self.config.is_shutdown_requested() {
                log::debug!("Shutdown requested after {} files", idx);
                return Err(FinderError::Interrupted);
            }

            let stats = matcher.scan_file(*id, &mut cache, &mut store)?;
            summary.matcher.merge(&stats);
            summary.tokenized_files += 1;

            if let Some(ref callback) = self.config.progress_callback {
                let path = cache.path(*id).map(display_path).unwrap_or_default();
                callback.on_progress(idx + 1, &path);
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("match");
        }

        let groups = store.ranked_matches();

        summary.total_tokens = summary.matcher.tokens;
        summary.total_bytes = cache.total_bytes();
        summary.windows_indexed = store.stats().windows_indexed;
        summary.duplicate_groups = groups.len();
        summary.cross_file_groups = groups.iter().filter(|g| g.spans_files()).count();
        summary.duplicated_lines = groups.iter().map(MatchGroup::duplicated_lines).sum();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate groups ({} across files), {} duplicated lines, {} tokens in {}",
            summary.duplicate_groups,
            summary.cross_file_groups,
            summary.duplicated_lines,
            summary.total_tokens,
            summary.total_bytes_display()
        );

        Ok((groups, summary))
    }
}

fn display_path(path: &Arc<Path>) -> String {
    path.to_string_lossy().into_owned()
}
