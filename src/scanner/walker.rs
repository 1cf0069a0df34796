//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Features
//!
//! - Parallel directory reading on the jwalk rayon pool
//! - Children sorted by name for deterministic output
//! - Gitignore-style exclusion (root `.gitignore` plus configured patterns),
//!   pruning excluded directories before they are read
//! - Optional include glob for files
//! - Hidden file filtering and configurable symlink following
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use codedupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("src"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::overrides::{Override, OverrideBuilder};
use jwalk::WalkDir;

use super::{FileEntry, ScanError, WalkerConfig, VCS_DIRS};
use crate::progress::ProgressCallback;

/// Directory walker for parallel file discovery.
pub struct Walker {
    /// Root path to walk (a directory or a single file)
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback, told about every accepted file
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory (or single file) to scan
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set, iteration stops at the next entry.
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

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build gitignore matcher from config patterns and the root's .gitignore.
    fn build_gitignore(&self) -> Option<Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.root);

        let gitignore_path = self.root.join(".gitignore");
        if gitignore_path.is_file() {
            if let Some(e) = builder.add(&gitignore_path) {
                log::warn!(
                    "Failed to load .gitignore from {}: {}",
                    gitignore_path.display(),
                    e
                );
            } else {
                log::debug!("Loaded .gitignore from {}", gitignore_path.display());
            }
        }

        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Build the include matcher from the configured glob.
    fn build_include(&self) -> Option<Override> {
        let pattern = self.config.pattern.as_deref()?;
        let mut builder = OverrideBuilder::new(&self.root);
        let built = builder.add(pattern).and_then(|b| b.build());
        match built {
            Ok(include) => Some(include),
            Err(e) => {
                log::warn!("Invalid include pattern '{}': {}", pattern, e);
                None
            }
        }
    }

    /// Walk the tree, yielding accepted files in sorted order.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. A root that is itself a file yields just that file,
    /// without applying the include glob.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileEntry, ScanError>> + '_ {
        let gitignore = self.build_gitignore().map(Arc::new);
        let include = self.build_include();
        let root_is_file = self.root.is_file();
        let mut accepted = 0usize;

        let prune = gitignore.clone();
        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(self.config.skip_hidden)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
                children.retain(|child| match child {
                    Ok(entry) if entry.file_type().is_dir() => {
                        let name = entry.file_name().to_string_lossy();
                        if VCS_DIRS.contains(&name.as_ref()) {
                            return false;
                        }
                        prune
                            .as_ref()
                            .map_or(true, |gi| !gi.matched(entry.path(), true).is_ignore())
                    }
                    _ => true,
                });
            });

        walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    return Some(self.handle_jwalk_error(path, e));
                }
            };

            let path = entry.path();
            let file_type = entry.file_type();
            if file_type.is_dir() {
                return None;
            }

            if !root_is_file {
                if let Some(gi) = &gitignore {
                    if gi.matched(&path, false).is_ignore() {
                        log::trace!("Ignoring file: {}", path.display());
                        return None;
                    }
                }
                if let Some(include) = &include {
                    if !include.matched(&path, false).is_whitelist() {
                        log::trace!("Not matching include pattern: {}", path.display());
                        return None;
                    }
                }
            }

            let is_symlink = file_type.is_symlink();
            if is_symlink && !self.config.follow_symlinks {
                log::trace!("Skipping symlink: {}", path.display());
                return None;
            }

            let metadata = if self.config.follow_symlinks {
                std::fs::metadata(&path)
            } else {
                std::fs::symlink_metadata(&path)
            };
            let metadata = match metadata {
                Ok(m) => m,
                Err(e) => return Some(self.handle_io_error(&path, e)),
            };
            if !metadata.is_file() {
                return None;
            }

            accepted += 1;
            if let Some(callback) = &self.progress_callback {
                callback.on_progress(accepted, path.to_string_lossy().as_ref());
            }

            Some(Ok(FileEntry {
                path,
                size: metadata.len(),
                is_symlink,
            }))
        })
    }

    /// Handle I/O errors during file access.
    fn handle_io_error(&self, path: &Path, error: std::io::Error) -> Result<FileEntry, ScanError> {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                Err(ScanError::PermissionDenied(path.to_path_buf()))
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                Err(ScanError::NotFound(path.to_path_buf()))
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                Err(ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                })
            }
        }
    }

    /// Handle jwalk errors.
    fn handle_jwalk_error(
        &self,
        path: PathBuf,
        error: jwalk::Error,
    ) -> Result<FileEntry, ScanError> {
        log::warn!("Walker error for {}: {}", path.display(), error);
        Err(ScanError::Io {
            path,
            source: std::io::Error::other(error.to_string()),
        })
    }
}
