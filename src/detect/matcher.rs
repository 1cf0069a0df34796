//! Rabin-Karp rolling matcher.
//!
//! # Overview
//!
//! One [`RollingMatcher`] pass runs over each file's token stream. It keeps
//! the last `N` token hashes (`N` = minimum match length in tokens) and a
//! polynomial hash of that window, updated in O(1) per token:
//!
//! ```text
//! add:    h = (h * 256 + t_new) mod 16777619
//! remove: h = (h - t_old * 256^(N-1)) mod 16777619
//! ```
//!
//! Whenever the window is full and another token arrives, the window start
//! is checked against every earlier window with the same hash. Candidates
//! that pass the validity guard are verified token by token and extended
//! as far as the two streams stay equal. Extensions of at least `N` tokens
//! are recorded in the [`MatchStore`], and the windows inside the reported
//! run are then skipped instead of being verified again.
//!
//! # Scan states
//!
//! - [`ScanState::Scanning`]: fewer than `N` tokens queued
//! - [`ScanState::WindowFull`]: every new token rolls the window
//! - [`ScanState::Skipping`]: inside a run that was just reported
//!
//! The last full window of a file is never checked; a match needs `N`
//! tokens plus at least one token after them to be rolled.
//!
//! # Ordering
//!
//! Files must be scanned one at a time, in order, with each file's windows
//! indexed as they are rolled. The same-file guard assumes every earlier
//! window is already in the bucket index when a later one is checked.

use std::collections::VecDeque;
use std::sync::Arc;

use sha1::{Digest, Sha1};

use super::store::{ContentDigest, ExactMatch, MatchEnd, MatchStore, TokenRef};
use super::token_hash::token_hash;
use super::EngineError;
use crate::tokens::{FileId, FileTokens, Token, TokenError, TokenSource};

/// Multiplicative base of the rolling hash (size of the token hash alphabet).
pub const HASH_BASE: u64 = 256;
/// Prime modulus of the rolling hash.
pub const HASH_MOD: u64 = 16_777_619;

/// Where a file scan currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Window not yet full
    Scanning,
    /// Window full, each new token triggers a roll
    WindowFull,
    /// Rolling through the interior of a reported match
    Skipping,
}

/// Counters for one or more file scans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatcherStats {
    /// Tokens fed into the window
    pub tokens: usize,
    /// Window rolls (full windows checked or skipped)
    pub windows: usize,
    /// Rolls that skipped verification inside a reported match
    pub skipped_windows: usize,
    /// Bucket candidates examined
    pub candidates: usize,
    /// Candidates rejected by the validity guard
    pub guard_rejections: usize,
    /// Verified extensions shorter than the window (hash collisions)
    pub short_extensions: usize,
    /// Extensions recorded as exact matches
    pub verified_matches: usize,
}

impl MatcherStats {
    /// Add another scan's counters to these.
    pub fn merge(&mut self, other: &Self) {
        self.tokens += other.tokens;
        self.windows += other.windows;
        self.skipped_windows += other.skipped_windows;
        self.candidates += other.candidates;
        self.guard_rejections += other.guard_rejections;
        self.short_extensions += other.short_extensions;
        self.verified_matches += other.verified_matches;
    }
}

/// Result of walking two token streams in lockstep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// Number of equal tokens before the first mismatch or stream end
    pub len: usize,
    /// Digest over the matched token values
    pub digest: ContentDigest,
    /// Lines of the last matched token on each side
    pub end_lines: Option<(u32, u32)>,
}

/// Rolling hash of a complete window, computed directly.
///
/// Equal to the matcher's incremental hash once the same values fill its
/// window.
///
/// # Example
///
/// ```
/// use codedupe::detect::matcher::window_hash;
///
/// assert_eq!(window_hash(["a"]), u32::from(b'a'));
/// assert_eq!(window_hash(["a", "b"]), 97 * 256 + 98);
/// ```
#[must_use]
pub fn window_hash<'a>(values: impl IntoIterator<Item = &'a str>) -> u32 {
    values.into_iter().fold(0u32, |h, v| {
        ((u64::from(h) * HASH_BASE + u64::from(token_hash(v))) % HASH_MOD) as u32
    })
}

/// Walk both streams from `a` and `b` while token values stay equal.
///
/// # Errors
///
/// Returns [`TokenError::FileMismatch`] if a token does not belong to the
/// stream it is resumed from.
pub fn extend(
    a_stream: &FileTokens,
    a: &Token,
    b_stream: &FileTokens,
    b: &Token,
) -> Result<Extension, TokenError> {
    let tail_a = a_stream.resume(a.file, a.seq)?;
    let tail_b = b_stream.resume(b.file, b.seq)?;

    let mut hasher = Sha1::new();
    let mut len = 0usize;
    let mut end_lines = None;
    for (x, y) in tail_a.iter().zip(tail_b) {
        if x.value != y.value {
            break;
        }
        hasher.update(x.value.as_bytes());
        hasher.update([0u8]);
        end_lines = Some((x.line, y.line));
        len += 1;
    }

    let mut digest = [0u8; 20];
    digest.copy_from_slice(&hasher.finalize());
    Ok(Extension {
        len,
        digest: ContentDigest(digest),
        end_lines,
    })
}

/// Sliding-window matcher state for one file scan.
#[derive(Debug)]
pub struct RollingMatcher {
    window_size: usize,
    /// 256^(N-1) mod HASH_MOD, the weight of the oldest window token
    base_pow: u64,
    window: VecDeque<(u8, u32)>,
    cur_hash: u32,
    skip: usize,
    stats: MatcherStats,
}

impl RollingMatcher {
    /// Create a matcher for windows of `window_size` tokens.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWindowSize`] if `window_size` is zero.
    pub fn new(window_size: usize) -> Result<Self, EngineError> {
        if window_size == 0 {
            return Err(EngineError::InvalidWindowSize(window_size));
        }
        let base_pow = (1..window_size).fold(1u64, |p, _| p * HASH_BASE % HASH_MOD);
        Ok(Self {
            window_size,
            base_pow,
            window: VecDeque::with_capacity(window_size + 1),
            cur_hash: 0,
            skip: 0,
            stats: MatcherStats::default(),
        })
    }

    /// Window length in tokens.
    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Current rolling hash.
    #[must_use]
    pub fn current_hash(&self) -> u32 {
        self.cur_hash
    }

    /// Counters for the current (or last) file scan.
    #[must_use]
    pub fn stats(&self) -> &MatcherStats {
        &self.stats
    }

    /// Current scan state.
    #[must_use]
    pub fn state(&self) -> ScanState {
        if self.window.len() < self.window_size {
            ScanState::Scanning
        } else if self.skip > 0 {
            ScanState::Skipping
        } else {
            ScanState::WindowFull
        }
    }

    /// Clear the window and counters before a new file.
    pub fn reset(&mut self) {
        self.window.clear();
        self.cur_hash = 0;
        self.skip = 0;
        self.stats = MatcherStats::default();
    }

    /// Run one full pass over `file`, indexing its windows and recording matches.
    ///
    /// Returns the counters for this file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Token`] if the file (or a file referenced by a
    /// candidate window) cannot be tokenized.
    pub fn scan_file<S>(
        &mut self,
        file: FileId,
        source: &mut S,
        store: &mut MatchStore,
    ) -> Result<MatcherStats, EngineError>
    where
        S: TokenSource + ?Sized,
    {
        self.reset();
        let tokens = source.file_tokens(file)?;

        for token in tokens.tokens() {
            self.roll_window(&tokens, source, store)?;
            self.add_token(token);
        }

        // The trailing window cannot start a match
        self.window.clear();
        self.skip = 0;

        log::debug!(
            "Scanned {}: {} tokens, {} windows, {} matches",
            tokens.path().display(),
            self.stats.tokens,
            self.stats.windows,
            self.stats.verified_matches
        );
        Ok(self.stats.clone())
    }

    /// Push `token` into the window and return the updated hash.
    pub fn add_token(&mut self, token: &Token) -> u32 {
        let th = token_hash(&token.value);
        self.cur_hash =
            ((u64::from(self.cur_hash) * HASH_BASE + u64::from(th)) % HASH_MOD) as u32;
        self.window.push_back((th, token.seq));
        self.stats.tokens += 1;
        self.cur_hash
    }

    /// Drop the oldest token once the window is full.
    ///
    /// The full window is checked for matches (unless inside a reported
    /// match), then recorded in the bucket index regardless.
    fn roll_window<S>(
        &mut self,
        current: &Arc<FileTokens>,
        source: &mut S,
        store: &mut MatchStore,
    ) -> Result<(), EngineError>
    where
        S: TokenSource + ?Sized,
    {
        if self.window.len() < self.window_size {
            return Ok(());
        }
        let Some((oldest_hash, start_seq)) = self.window.pop_front() else {
            return Ok(());
        };
        self.stats.windows += 1;

        if self.skip == 0 {
            let found = self.find_matches(self.cur_hash, current, start_seq, source, store)?;
            self.skip = found.saturating_sub(1);
        } else {
            self.skip -= 1;
            self.stats.skipped_windows += 1;
        }

        store.add_hash(
            self.cur_hash,
            TokenRef {
                file: current.id(),
                seq: start_seq,
            },
        );

        let weighted = u64::from(oldest_hash) * self.base_pow % HASH_MOD;
        self.cur_hash = ((u64::from(self.cur_hash) + HASH_MOD - weighted) % HASH_MOD) as u32;
        Ok(())
    }

    /// Check the window starting at `start_seq` against earlier windows with `hash`.
    ///
    /// Every candidate passing the validity guard is extended; extensions of
    /// at least one window are recorded in `store`.
    ///
    /// Returns the longest recorded extension, or 0.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Token`] if a candidate's file cannot be loaded.
    pub fn find_matches<S>(
        &mut self,
        hash: u32,
        current: &Arc<FileTokens>,
        start_seq: u32,
        source: &mut S,
        store: &mut MatchStore,
    ) -> Result<usize, EngineError>
    where
        S: TokenSource + ?Sized,
    {
        let candidates = store.hash_match(hash);
        if candidates.is_empty() {
            return Ok(0);
        }
        let candidates = candidates.to_vec();
        let Some(token0) = current.get(start_seq) else {
            return Ok(0);
        };

        let mut max_len = 0usize;
        for candidate in candidates {
            self.stats.candidates += 1;

            let other = if candidate.file == current.id() {
                Arc::clone(current)
            } else {
                source.file_tokens(candidate.file)?
            };
            let Some(candidate_token) = other.get(candidate.seq) else {
                continue;
            };

            if !self.is_valid_candidate(token0, candidate_token) {
                self.stats.guard_rejections += 1;
                continue;
            }

            let ext = extend(current, token0, &other, candidate_token)?;
            let Some((end_line, candidate_end_line)) = ext.end_lines else {
                continue;
            };
            if ext.len < self.window_size {
                log::trace!(
                    "Hash collision at {}:{} ran only {} tokens",
                    current.path().display(),
                    token0.line,
                    ext.len
                );
                self.stats.short_extensions += 1;
                continue;
            }

            log::trace!(
                "Match of {} tokens: {}:{} = {}:{}",
                ext.len,
                current.path().display(),
                token0.line,
                other.path().display(),
                candidate_token.line
            );
            store.add_exact_match(ExactMatch {
                token_len: ext.len,
                digest: ext.digest,
                first: MatchEnd {
                    file: current.id(),
                    path: Arc::clone(current.path()),
                    start_seq: token0.seq,
                    start_line: token0.line,
                    end_line,
                },
                second: MatchEnd {
                    file: other.id(),
                    path: Arc::clone(other.path()),
                    start_seq: candidate_token.seq,
                    start_line: candidate_token.line,
                    end_line: candidate_end_line,
                },
            });
            self.stats.verified_matches += 1;
            max_len = max_len.max(ext.len);
        }
        Ok(max_len)
    }

    /// Validity guard applied before extending a candidate.
    ///
    /// Values must be equal. A candidate in another file always passes; one
    /// in the same file must start more than a window earlier, so overlapping
    /// windows of a repetitive run are never paired and each same-file pair
    /// is evaluated once, from its later side.
    #[must_use]
    pub fn is_valid_candidate(&self, current: &Token, candidate: &Token) -> bool {
        current.value == candidate.value
            && (current.file != candidate.file
                || (current.seq.abs_diff(candidate.seq) as usize > self.window_size
                    && current.seq > candidate.seq))
    }
}
