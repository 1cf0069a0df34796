//! Duplicate detection engine.
//!
//! # Overview
//!
//! Duplicates are found in one pass over every file's token stream:
//!
//! 1. [`token_hash`] reduces each token to one byte
//! 2. [`RollingMatcher`] keeps a Rabin-Karp hash of the last `N` tokens and
//!    looks up every full window in the [`MatchStore`] bucket index
//! 3. Candidate windows are verified token by token and extended as far as
//!    they go; verified runs are grouped by content digest
//! 4. [`MatchStore::iter_matches`] yields the groups that meet the minimum
//!    token and line thresholds
//!
//! [`DuplicateFinder`] drives the whole pipeline for a set of paths.
//!
//! # Example
//!
//! ```
//! use codedupe::detect::{MatchStore, RollingMatcher};
//! use codedupe::tokens::{LexerRegistry, TokenCache};
//!
//! let body: String = (0..4)
//!     .map(|i| format!("int v{} = a{} + b * c - d / e;\n", i, i))
//!     .collect();
//! let mut cache = TokenCache::new(LexerRegistry::with_builtin_languages(), false);
//! let a = cache.add_source("a.c", &format!("int x;\n{}int y;\n", body)).unwrap();
//! let b = cache.add_source("b.c", &format!("char z;\n{}char w;\n", body)).unwrap();
//!
//! let mut store = MatchStore::new(20, 1).unwrap();
//! let mut matcher = RollingMatcher::new(20).unwrap();
//! for id in [a, b] {
//!     matcher.scan_file(id, &mut cache, &mut store).unwrap();
//! }
//!
//! let groups: Vec<_> = store.iter_matches().collect();
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].len(), 2);
//! ```

pub mod finder;
pub mod matcher;
pub mod store;
pub mod token_hash;

pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanSummary};
pub use matcher::{MatcherStats, RollingMatcher, ScanState};
pub use store::{
    ContentDigest, ExactMatch, MatchEnd, MatchGroup, MatchStore, Occurrence, StoreStats, TokenRef,
};
pub use token_hash::{fnv8, token_hash};

use crate::tokens::TokenError;

/// Errors raised by the matching engine.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// A window of zero tokens cannot be hashed or matched.
    #[error("Minimum token count must be at least 1 (got {0})")]
    InvalidWindowSize(usize),

    /// A token stream could not be produced or resumed.
    #[error(transparent)]
    Token(#[from] TokenError),
}
