//! Layered configuration.
//!
//! Settings are merged from, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. TOML file: `--config FILE`, or `config.toml` in the platform config
//!    directory (e.g. `~/.config/codedupe/config.toml`)
//! 3. Environment variables prefixed `CODEDUPE_` (e.g. `CODEDUPE_MIN_TOKENS=50`)
//! 4. Command-line flags ([`Config::apply_scan_args`])
//!
//! Unknown keys in the file are reported with a "did you mean" suggestion.
//!
//! # Example file
//!
//! ```toml
//! min_tokens = 80
//! min_lines = 4
//! fuzzy = true
//! pattern = "*.c"
//! ignore_patterns = ["vendor/", "*.gen.c"]
//! format = "json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::{OutputFormat, ScanArgs};
use crate::detect::finder::{DEFAULT_IO_THREADS, DEFAULT_MIN_LINES, DEFAULT_MIN_TOKENS};
use crate::detect::FinderConfig;
use crate::scanner::WalkerConfig;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "CODEDUPE_";

/// Keys accepted in the configuration file.
pub const KNOWN_KEYS: &[&str] = &[
    "min_tokens",
    "min_lines",
    "fuzzy",
    "io_threads",
    "skip_hidden",
    "follow_symlinks",
    "ignore_patterns",
    "pattern",
    "format",
    "strict",
];

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum match length in tokens.
    pub min_tokens: usize,
    /// Minimum match length in lines.
    pub min_lines: u32,
    /// Ignore identifier names and literal values.
    pub fuzzy: bool,
    /// Tokenizer threads.
    pub io_threads: usize,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
    /// Gitignore-style exclusion patterns.
    pub ignore_patterns: Vec<String>,
    /// Include glob for file names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Default report format.
    pub format: OutputFormat,
    /// Fail on the first unreadable file.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_tokens: DEFAULT_MIN_TOKENS,
            min_lines: DEFAULT_MIN_LINES,
            fuzzy: false,
            io_threads: DEFAULT_IO_THREADS,
            skip_hidden: false,
            follow_symlinks: false,
            ignore_patterns: Vec::new(),
            pattern: None,
            format: OutputFormat::Text,
            strict: false,
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Merging or extracting the layered configuration failed.
    #[error("Invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// The platform config directory could not be determined.
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Figment(Box::new(e))
    }
}

impl Config {
    /// Load configuration from the platform config file and environment.
    ///
    /// Falls back to defaults (with a warning) if loading fails.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from_path(None)
    }

    /// Load configuration using `path` as the config file, if given.
    ///
    /// Falls back to defaults (with a warning) if loading fails.
    #[must_use]
    pub fn load_from_path(path: Option<&Path>) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration, reporting failures.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if the file or environment holds
    /// values of the wrong type.
    pub fn try_load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_path().ok(),
        };

        if let Some(file) = &file {
            if file.is_file() {
                log::debug!("Loading configuration from {}", file.display());
                warn_unknown_keys(file);
            } else if path.is_some() {
                log::warn!("Config file {} does not exist", file.display());
            }
        }

        let config = Self::figment(file.as_deref()).extract()?;
        Ok(config)
    }

    /// The layered figment: defaults, then `file` (if any), then environment.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if there is no home directory.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dirs = ProjectDirs::from("", "", "codedupe").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply command-line flags on top of the loaded configuration.
    ///
    /// Options and switches given on the command line replace configured
    /// values. Ignore patterns are appended.
    pub fn apply_scan_args(&mut self, args: &ScanArgs) {
        if let Some(n) = args.min_tokens {
            self.min_tokens = n;
        }
        if let Some(n) = args.min_lines {
            self.min_lines = n;
        }
        if let Some(n) = args.io_threads {
            self.io_threads = n;
        }
        if args.pattern.is_some() {
            self.pattern.clone_from(&args.pattern);
        }
        apply_switch(&mut self.fuzzy, args.fuzzy, args.no_fuzzy);
        apply_switch(&mut self.skip_hidden, args.skip_hidden, args.no_skip_hidden);
        apply_switch(
            &mut self.follow_symlinks,
            args.follow_symlinks,
            args.no_follow_symlinks,
        );
        apply_switch(&mut self.strict, args.strict, args.no_strict);
        self.ignore_patterns
            .extend(args.ignore_patterns.iter().cloned());

        self.format = args
            .format
            .or_else(|| args.output.as_deref().and_then(OutputFormat::from_extension))
            .unwrap_or(self.format);
    }

    /// Walker settings from this configuration.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            ignore_patterns: self.ignore_patterns.clone(),
            pattern: self.pattern.clone(),
        }
    }

    /// Finder settings from this configuration.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_min_tokens(self.min_tokens)
            .with_min_lines(self.min_lines)
            .with_fuzzy(self.fuzzy)
            .with_io_threads(self.io_threads)
            .with_strict(self.strict)
            .with_walker_config(self.walker_config())
    }
}

/// Closest known key to `key`, if similar enough to be a likely typo.
#[must_use]
pub fn suggest_key(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .map(|known| (*known, strsim::jaro_winkler(key, known)))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(known, _)| known)
}

/// Top-level keys of a TOML document that are not configuration keys.
///
/// Documents that do not parse yield nothing; figment reports those.
#[must_use]
pub fn unknown_keys(content: &str) -> Vec<String> {
    match content.parse::<toml::Table>() {
        Ok(table) => table
            .keys()
            .filter(|k| !KNOWN_KEYS.contains(&k.as_str()))
            .cloned()
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn warn_unknown_keys(file: &Path) {
    let Ok(content) = fs::read_to_string(file) else {
        return;
    };
    for key in unknown_keys(&content) {
        match suggest_key(&key) {
            Some(known) => log::warn!(
                "Unknown config key '{}' in {} (did you mean '{}'?)",
                key,
                file.display(),
                known
            ),
            None => log::warn!("Unknown config key '{}' in {}", key, file.display()),
        }
    }
}

/// A `--flag`/`--no-flag` pair; clap keeps at most one of them set.
fn apply_switch(value: &mut bool, on: bool, off: bool) {
    if on {
        *value = true;
    } else if off {
        *value = false;
    }
}
