//! Match store: candidate lookup and grouping of verified matches.
//!
//! # Overview
//!
//! The store keeps two independent indexes:
//!
//! - **Bucket index**: rolling-hash value to every window start that produced
//!   it, in scan order. Append-only; lookups return earlier windows first,
//!   which the matcher relies on to compare each window only against windows
//!   seen before it.
//! - **Group index**: content digest to [`MatchGroup`]. Independently
//!   discovered pairs with the same content collapse into one group, and the
//!   same occurrence is never recorded twice.
//!
//! # Example
//!
//! ```
//! use codedupe::detect::{ContentDigest, ExactMatch, MatchEnd, MatchStore};
//! use codedupe::tokens::FileId;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let mut store = MatchStore::new(10, 3).unwrap();
//! let end = |id: u32, seq: u32, line: u32| MatchEnd {
//!     file: FileId(id),
//!     path: Arc::from(Path::new("/src/x.c")),
//!     start_seq: seq,
//!     start_line: line,
//!     end_line: line + 4,
//! };
//!
//! store.add_exact_match(ExactMatch {
//!     token_len: 40,
//!     digest: ContentDigest([7; 20]),
//!     first: end(1, 0, 1),
//!     second: end(0, 50, 12),
//! });
//!
//! let groups: Vec<_> = store.iter_matches().collect();
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].matched_lines(), 5);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::EngineError;
use crate::tokens::FileId;

/// 160-bit digest over the token values of a verified match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest(pub [u8; 20]);

impl ContentDigest {
    /// Digest as lowercase hexadecimal (40 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A window start recorded in the bucket index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenRef {
    /// File containing the window
    pub file: FileId,
    /// Sequence index of the window's first token
    pub seq: u32,
}

/// One side of a verified match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEnd {
    /// File containing this side
    pub file: FileId,
    /// Path of the file
    pub path: Arc<Path>,
    /// Sequence index of the first matched token
    pub start_seq: u32,
    /// Line of the first matched token
    pub start_line: u32,
    /// Line of the last matched token
    pub end_line: u32,
}

impl MatchEnd {
    /// Lines spanned from first to last matched token, inclusive.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    fn to_occurrence(&self) -> Occurrence {
        Occurrence {
            file: self.file,
            path: Arc::clone(&self.path),
            start_token: self.start_seq,
            start_line: self.start_line,
            line_count: self.line_count(),
        }
    }
}

/// A verified pair of identical token runs, extended to maximal length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactMatch {
    /// Number of matched tokens
    pub token_len: usize,
    /// Digest of the matched token values
    pub digest: ContentDigest,
    /// The later occurrence (the window being scanned)
    pub first: MatchEnd,
    /// The earlier occurrence (found in the bucket index)
    pub second: MatchEnd,
}

/// Where one copy of a duplicated block lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// File id within the run
    pub file: FileId,
    /// Path of the file
    pub path: Arc<Path>,
    /// Sequence index of the block's first token
    pub start_token: u32,
    /// Line of the block's first token
    pub start_line: u32,
    /// Lines spanned by the block
    pub line_count: u32,
}

/// All occurrences of one duplicated block.
#[derive(Debug, Clone)]
pub struct MatchGroup {
    /// Digest shared by every occurrence
    pub digest: ContentDigest,
    /// Length of the block in tokens
    pub token_len: usize,
    /// Occurrences in discovery order
    pub occurrences: Vec<Occurrence>,
    seen: HashSet<(FileId, u32)>,
}

impl PartialEq for MatchGroup {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
            && self.token_len == other.token_len
            && self.occurrences == other.occurrences
    }
}

impl Eq for MatchGroup {}

impl MatchGroup {
    fn new(digest: ContentDigest, token_len: usize) -> Self {
        Self {
            digest,
            token_len,
            occurrences: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Build a group from known occurrences, dropping repeated positions.
    #[must_use]
    pub fn with_occurrences(
        digest: ContentDigest,
        token_len: usize,
        occurrences: impl IntoIterator<Item = Occurrence>,
    ) -> Self {
        let mut group = Self::new(digest, token_len);
        for occurrence in occurrences {
            group.insert(occurrence);
        }
        group
    }

    /// Add an occurrence unless the same file position is already present.
    ///
    /// Returns `true` if the occurrence was new.
    fn insert(&mut self, occurrence: Occurrence) -> bool {
        if !self.seen.insert((occurrence.file, occurrence.start_token)) {
            return false;
        }
        self.occurrences.push(occurrence);
        true
    }

    /// Largest line span across occurrences; the ranking key.
    #[must_use]
    pub fn matched_lines(&self) -> u32 {
        self.occurrences
            .iter()
            .map(|o| o.line_count)
            .max()
            .unwrap_or(0)
    }

    /// Number of occurrences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    /// Check if the group has no occurrences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// Number of distinct files the block appears in.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.occurrences
            .iter()
            .map(|o| o.file)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Check if the block appears in more than one file.
    #[must_use]
    pub fn spans_files(&self) -> bool {
        self.file_count() > 1
    }

    /// Lines that could be removed by keeping a single copy.
    #[must_use]
    pub fn duplicated_lines(&self) -> u64 {
        u64::from(self.matched_lines()) * self.len().saturating_sub(1) as u64
    }
}

/// Counters kept by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Windows recorded in the bucket index
    pub windows_indexed: usize,
    /// Verified matches submitted
    pub exact_matches: usize,
    /// Occurrences ignored because they were already grouped
    pub repeated_occurrences: usize,
}

/// Bucket index plus content-digest group index.
#[derive(Debug)]
pub struct MatchStore {
    min_tokens: usize,
    min_lines: u32,
    buckets: HashMap<u32, Vec<TokenRef>>,
    groups: Vec<MatchGroup>,
    by_digest: HashMap<ContentDigest, usize>,
    stats: StoreStats,
}

impl MatchStore {
    /// Create an empty store.
    ///
    /// # Arguments
    ///
    /// * `min_tokens` - Groups shorter than this many tokens are never reported
    /// * `min_lines` - Groups spanning fewer lines are never reported
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWindowSize`] if `min_tokens` is zero.
    pub fn new(min_tokens: usize, min_lines: u32) -> Result<Self, EngineError> {
        if min_tokens == 0 {
            return Err(EngineError::InvalidWindowSize(min_tokens));
        }
        Ok(Self {
            min_tokens,
            min_lines,
            buckets: HashMap::new(),
            groups: Vec::new(),
            by_digest: HashMap::new(),
            stats: StoreStats::default(),
        })
    }

    /// Minimum token length of a reported group.
    #[must_use]
    pub fn min_tokens(&self) -> usize {
        self.min_tokens
    }

    /// Minimum line span of a reported group.
    #[must_use]
    pub fn min_lines(&self) -> u32 {
        self.min_lines
    }

    /// Record a window start under its rolling hash.
    pub fn add_hash(&mut self, hash: u32, window_start: TokenRef) {
        self.buckets.entry(hash).or_default().push(window_start);
        self.stats.windows_indexed += 1;
    }

    /// Window starts previously recorded under `hash`, oldest first.
    #[must_use]
    pub fn hash_match(&self, hash: u32) -> &[TokenRef] {
        self.buckets.get(&hash).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct hashes in the bucket index.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Group a verified match by its digest.
    ///
    /// The first match for a digest creates a group holding both sides;
    /// later ones only add sides not already present.
    ///
    /// Returns `true` if any new occurrence was recorded.
    pub fn add_exact_match(&mut self, m: ExactMatch) -> bool {
        self.stats.exact_matches += 1;

        let index = match self.by_digest.get(&m.digest) {
            Some(&index) => index,
            None => {
                log::trace!(
                    "New match group {} ({} tokens)",
                    m.digest,
                    m.token_len
                );
                self.groups.push(MatchGroup::new(m.digest, m.token_len));
                self.by_digest.insert(m.digest, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[index];
        group.token_len = group.token_len.max(m.token_len);

        let mut added = false;
        for end in [&m.second, &m.first] {
            if group.insert(end.to_occurrence()) {
                added = true;
            } else {
                self.stats.repeated_occurrences += 1;
            }
        }
        added
    }

    /// Every group recorded so far, reported or not, in creation order.
    #[must_use]
    pub fn groups(&self) -> &[MatchGroup] {
        &self.groups
    }

    /// Groups that pass the token and line thresholds, in creation order.
    ///
    /// Groups with fewer than two occurrences are skipped.
    pub fn iter_matches(&self) -> impl Iterator<Item = &MatchGroup> + '_ {
        self.groups.iter().filter(move |g| {
            g.len() > 1 && g.token_len >= self.min_tokens && g.matched_lines() >= self.min_lines
        })
    }

    /// Reported groups sorted by matched lines, largest first.
    ///
    /// The sort is stable: equal groups keep creation order.
    #[must_use]
    pub fn ranked_matches(&self) -> Vec<MatchGroup> {
        let mut groups: Vec<MatchGroup> = self.iter_matches().cloned().collect();
        groups.sort_by(|a, b| b.matched_lines().cmp(&a.matched_lines()));
        groups
    }

    /// Store counters.
    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }
}
