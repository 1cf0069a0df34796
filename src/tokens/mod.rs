//! Token source for the fingerprinting engine.
//!
//! The matcher never looks at raw source text. It consumes typed, positioned
//! [`Token`]s produced by this module:
//!
//! - [`lexer`]: generic source lexer and the per-extension [`LexerRegistry`]
//! - [`cache`]: per-run [`TokenCache`] that tokenizes each file once and
//!   hands out shared, read-only [`FileTokens`]
//!
//! # Resuming
//!
//! Match extension walks two token streams in lockstep from arbitrary
//! positions. [`FileTokens::resume`] returns the tail of a file's stream
//! starting at a given sequence index, and refuses to resume a token that
//! belongs to a different file.
//!
//! # Example
//!
//! ```
//! use codedupe::tokens::{TokenCache, TokenSource};
//! use codedupe::tokens::lexer::LexerRegistry;
//!
//! let mut cache = TokenCache::new(LexerRegistry::with_builtin_languages(), false);
//! let id = cache.add_source("demo.c", "int x = 1; /* note */").unwrap();
//!
//! let tokens = cache.file_tokens(id).unwrap();
//! let values: Vec<&str> = tokens.tokens().iter().map(|t| t.value.as_str()).collect();
//! assert_eq!(values, ["int", "x", "=", "1", ";"]);
//! ```

pub mod cache;
pub mod lexer;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use cache::TokenCache;
pub use lexer::{LanguageSpec, Lexer, LexerRegistry};

/// Interned identifier of a source file within one run.
///
/// Ids are assigned in registration order, which is also the scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// File this token was read from
    pub file: FileId,
    /// 1-based line of the token's first character
    pub line: u32,
    /// Byte offset of the token's first character within the file
    pub char_offset: u32,
    /// Token text (or its fuzzy placeholder)
    pub value: String,
    /// 0-based index of this token within its file's stream
    pub seq: u32,
}

/// The complete token stream of one file.
#[derive(Debug, Clone)]
pub struct FileTokens {
    id: FileId,
    path: Arc<Path>,
    tokens: Vec<Token>,
}

impl FileTokens {
    /// Wrap an already lexed token stream.
    ///
    /// # Panics
    ///
    /// Debug assertion fails if a token's `file` or `seq` does not match
    /// its place in the stream.
    #[must_use]
    pub fn new(id: FileId, path: Arc<Path>, tokens: Vec<Token>) -> Self {
        debug_assert!(tokens
            .iter()
            .enumerate()
            .all(|(i, t)| t.file == id && t.seq as usize == i));
        Self { id, path, tokens }
    }

    /// File id of this stream.
    #[must_use]
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Arc<Path> {
        &self.path
    }

    /// All tokens in stream order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if the file produced no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token at sequence index `seq`.
    #[must_use]
    pub fn get(&self, seq: u32) -> Option<&Token> {
        self.tokens.get(seq as usize)
    }

    /// Resume the stream at `seq`, which must refer to a token of `file`.
    ///
    /// A position at or past the end yields an empty slice; an exhausted
    /// stream is an ordinary end of extension, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::FileMismatch`] if `file` is not this stream's file.
    pub fn resume(&self, file: FileId, seq: u32) -> Result<&[Token], TokenError> {
        if file != self.id {
            return Err(TokenError::FileMismatch {
                expected: self.id,
                found: file,
            });
        }
        let start = (seq as usize).min(self.tokens.len());
        Ok(&self.tokens[start..])
    }
}

/// Access to per-file token streams.
///
/// Implementations must return the same stream for the same id for the
/// whole run; the matcher relies on positions staying valid.
pub trait TokenSource {
    /// Token stream for `file`, tokenizing it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if the file cannot be read or has no lexer.
    fn file_tokens(&mut self, file: FileId) -> Result<Arc<FileTokens>, TokenError>;
}

/// Errors that can occur while producing token streams.
#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    /// No lexer is registered for the file's extension.
    #[error("No lexer for {0}")]
    UnsupportedLanguage(PathBuf),

    /// The file looks like binary data.
    #[error("Binary file skipped: {0}")]
    Binary(PathBuf),

    /// The file is not valid UTF-8 text.
    #[error("Invalid UTF-8 skipped: {0}")]
    InvalidUtf8(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file id was never registered with the source.
    #[error("Unknown file id {0}")]
    UnknownFile(FileId),

    /// A stream was asked to resume from a token of another file.
    #[error("Cannot resume stream of file {expected} from a token of file {found}")]
    FileMismatch {
        /// File the stream belongs to
        expected: FileId,
        /// File the requested token belongs to
        found: FileId,
    },
}

impl TokenError {
    /// Path the error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::UnsupportedLanguage(p) | Self::Binary(p) | Self::InvalidUtf8(p) => Some(p),
            Self::Io { path, .. } => Some(path),
            Self::UnknownFile(_) | Self::FileMismatch { .. } => None,
        }
    }
}
