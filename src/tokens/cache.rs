//! Per-run token cache.
//!
//! Every file is tokenized at most once per run. The first request for a
//! file reads and lexes it; later requests (including match extension that
//! re-enters a file from another position) reuse the shared stream.
//!
//! Tokenizing is independent per file, so [`TokenCache::warm`] can fill the
//! cache up front on a bounded rayon pool before the sequential matching
//! pass begins. Once populated the streams are only ever read.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use super::lexer::LexerRegistry;
use super::{FileId, FileTokens, TokenError, TokenSource};
use crate::progress::ProgressCallback;

/// Lazily populated map from file to token stream.
#[derive(Debug)]
pub struct TokenCache {
    registry: LexerRegistry,
    fuzzy: bool,
    paths: Vec<Arc<Path>>,
    ids: HashMap<PathBuf, FileId>,
    streams: HashMap<FileId, Arc<FileTokens>>,
    total_bytes: u64,
}

impl TokenCache {
    /// Create an empty cache.
    ///
    /// # Arguments
    ///
    /// * `registry` - Languages available for tokenizing
    /// * `fuzzy` - Replace identifiers and literals with placeholders
    #[must_use]
    pub fn new(registry: LexerRegistry, fuzzy: bool) -> Self {
        Self {
            registry,
            fuzzy,
            paths: Vec::new(),
            ids: HashMap::new(),
            streams: HashMap::new(),
            total_bytes: 0,
        }
    }

    /// Registry used by this cache.
    #[must_use]
    pub fn registry(&self) -> &LexerRegistry {
        &self.registry
    }

    /// Whether fuzzy normalization is on.
    #[must_use]
    pub fn is_fuzzy(&self) -> bool {
        self.fuzzy
    }

    /// Intern a path, returning its id. Registering twice returns the same id.
    pub fn register(&mut self, path: &Path) -> FileId {
        if let Some(&id) = self.ids.get(path) {
            return id;
        }
        let id = FileId(u32::try_from(self.paths.len()).unwrap_or(u32::MAX));
        self.paths.push(Arc::from(path));
        self.ids.insert(path.to_path_buf(), id);
        id
    }

    /// Path of a registered file.
    #[must_use]
    pub fn path(&self, id: FileId) -> Option<&Arc<Path>> {
        self.paths.get(id.0 as usize)
    }

    /// Number of registered files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.paths.len()
    }

    /// Total bytes of source read so far.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Check if a file's stream is already cached.
    #[must_use]
    pub fn is_cached(&self, id: FileId) -> bool {
        self.streams.contains_key(&id)
    }

    /// Register in-memory source text under `path` and tokenize it.
    ///
    /// The language is still chosen from the path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::UnsupportedLanguage`] if no lexer matches `path`.
    pub fn add_source(&mut self, path: impl AsRef<Path>, source: &str) -> Result<FileId, TokenError> {
        let path = path.as_ref();
        let id = self.register(path);
        let tokens = tokenize_text(&self.registry, self.fuzzy, id, path, source)?;
        self.total_bytes += source.len() as u64;
        self.streams.insert(id, Arc::new(tokens));
        Ok(id)
    }

    /// Tokenize `ids` in parallel and cache the results.
    ///
    /// Files already cached are skipped. Returns the files that failed, in
    /// id order; they stay uncached.
    ///
    /// # Arguments
    ///
    /// * `ids` - Files to tokenize
    /// * `io_threads` - Size of the rayon pool used for reading and lexing
    /// * `progress` - Optional progress callback
    pub fn warm(
        &mut self,
        ids: &[FileId],
        io_threads: usize,
        progress: Option<&Arc<dyn ProgressCallback>>,
    ) -> Vec<(FileId, TokenError)> {
        let pending: Vec<(FileId, Arc<Path>)> = ids
            .iter()
            .filter(|id| !self.streams.contains_key(id))
            .filter_map(|&id| self.path(id).map(|p| (id, Arc::clone(p))))
            .collect();

        if pending.is_empty() {
            return Vec::new();
        }

        if let Some(callback) = progress {
            callback.on_phase_start("tokenize", pending.len());
        }
        log::info!("Tokenizing {} files", pending.len());

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(io_threads.max(1))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!(
                    "Failed to create tokenizer thread pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                None
            }
        };

        let registry = &self.registry;
        let fuzzy = self.fuzzy;
        let job = || {
            pending
                .par_iter()
                .enumerate()
                .map(|(idx, (id, path))| {
                    if let Some(callback) = progress {
                        callback.on_progress(idx + 1, path.to_string_lossy().as_ref());
                    }
                    (*id, read_and_tokenize(registry, fuzzy, *id, path))
                })
                .collect::<Vec<_>>()
        };
        let results = match pool {
            Some(pool) => pool.install(job),
            None => job(),
        };

        let mut failures = Vec::new();
        for (id, result) in results {
            match result {
                Ok((tokens, bytes)) => {
                    log::debug!(
                        "Tokenized {}: {} tokens",
                        tokens.path().display(),
                        tokens.len()
                    );
                    self.total_bytes += bytes;
                    self.streams.insert(id, Arc::new(tokens));
                }
                Err(e) => {
                    log::warn!("Skipping file: {}", e);
                    failures.push((id, e));
                }
            }
        }
        failures.sort_by_key(|(id, _)| *id);

        if let Some(callback) = progress {
            callback.on_phase_end("tokenize");
        }
        failures
    }
}

impl TokenSource for TokenCache {
    fn file_tokens(&mut self, file: FileId) -> Result<Arc<FileTokens>, TokenError> {
        if let Some(stream) = self.streams.get(&file) {
            return Ok(Arc::clone(stream));
        }
        let path = self.path(file).cloned().ok_or(TokenError::UnknownFile(file))?;
        let (tokens, bytes) = read_and_tokenize(&self.registry, self.fuzzy, file, &path)?;
        log::debug!("Tokenized {} lazily: {} tokens", path.display(), tokens.len());
        self.total_bytes += bytes;
        let stream = Arc::new(tokens);
        self.streams.insert(file, Arc::clone(&stream));
        Ok(stream)
    }
}

fn read_and_tokenize(
    registry: &LexerRegistry,
    fuzzy: bool,
    id: FileId,
    path: &Arc<Path>,
) -> Result<(FileTokens, u64), TokenError> {
    if !registry.supports(path) {
        return Err(TokenError::UnsupportedLanguage(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| TokenError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.contains(&0) {
        return Err(TokenError::Binary(path.to_path_buf()));
    }
    let text = std::str::from_utf8(&bytes)
        .map_err(|_| TokenError::InvalidUtf8(path.to_path_buf()))?;
    let tokens = tokenize_text(registry, fuzzy, id, path, text)?;
    Ok((tokens, bytes.len() as u64))
}

fn tokenize_text(
    registry: &LexerRegistry,
    fuzzy: bool,
    id: FileId,
    path: &Path,
    text: &str,
) -> Result<FileTokens, TokenError> {
    let lexer = registry
        .lexer_for(path, fuzzy)
        .ok_or_else(|| TokenError::UnsupportedLanguage(path.to_path_buf()))?;
    let tokens = lexer.tokenize(id, text);
    Ok(FileTokens::new(id, Arc::from(path), tokens))
}
