//! Scanner module for source file discovery.
//!
//! This module provides:
//! - Parallel directory walking using jwalk
//! - Gitignore-style exclusion patterns via the `ignore` crate
//! - An optional include glob (e.g. `*.c`) restricting which files are scanned
//!
//! Version-control metadata directories (`.git`, `.hg`, `.svn`, `.cvs`) are
//! never descended into.
//!
//! # Example
//!
//! ```no_run
//! use codedupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     pattern: Some("*.py".to_string()),
//!     skip_hidden: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod walker;

use std::path::{Path, PathBuf};

pub use walker::Walker;

/// Directory names that are never walked.
pub const VCS_DIRS: &[&str] = &[".git", ".hg", ".svn", ".cvs"];

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Whether this file was reached through a symbolic link
    pub is_symlink: bool,
}

impl FileEntry {
    /// Create a new `FileEntry`.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            is_symlink: false,
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Glob patterns to exclude (gitignore-style).
    /// These are applied in addition to any .gitignore file at the root.
    pub ignore_patterns: Vec<String>,

    /// Only files whose name matches this glob are scanned.
    /// Files given directly as inputs bypass it.
    pub pattern: Option<String>,
}

impl WalkerConfig {
    /// Check that the include glob and every ignore pattern parse.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidPattern`] for the first pattern that does
    /// not compile.
    pub fn validate(&self) -> Result<(), ScanError> {
        let root = Path::new("");
        if let Some(pattern) = &self.pattern {
            let mut builder = ignore::overrides::OverrideBuilder::new(root);
            builder
                .add(pattern)
                .and_then(|b| b.build().map(|_| ()))
                .map_err(|e| ScanError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
        }
        for pattern in &self.ignore_patterns {
            let mut builder = ignore::gitignore::GitignoreBuilder::new(root);
            builder
                .add_line(None, pattern)
                .map_err(|e| ScanError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }
}

/// Errors that can occur during file discovery.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A glob pattern did not compile.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Parser message
        message: String,
    },

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
