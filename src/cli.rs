//! Command-line interface definitions.
//!
//! Scan options are optional on the command line so that unset flags fall
//! through to the config file and environment (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Report blocks of at least 100 tokens and 3 lines under src/
//! codedupe scan src
//!
//! # Only C files, 50-token minimum, ignoring variable names
//! codedupe scan src -p '*.c' -m 50 --fuzzy
//!
//! # JSON report (format picked from the extension)
//! codedupe scan src -o dupes.json
//!
//! # Supported languages
//! codedupe languages
//! ```

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Token-based duplicate source code detector.
///
/// Finds blocks of code that appear more than once, within a file or across
/// files, using Rabin-Karp fingerprints over the token stream.
#[derive(Debug, Parser)]
#[command(name = "codedupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan files and directories for duplicated code
    Scan(ScanArgs),
    /// List the languages that can be tokenized
    Languages,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Files or directories to scan
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Minimum match length in tokens [default: 100]
    #[arg(short = 'm', long = "minimum", value_name = "TOKENS")]
    pub min_tokens: Option<usize>,

    /// Minimum match length in lines [default: 3]
    #[arg(long = "lines", value_name = "LINES")]
    pub min_lines: Option<u32>,

    /// Ignore identifier names and literal values when matching
    #[arg(short = 'z', long, overrides_with = "no_fuzzy")]
    pub fuzzy: bool,

    /// Match exact identifiers and literals even if the config enables fuzzy
    #[arg(long, overrides_with = "fuzzy")]
    pub no_fuzzy: bool,

    /// Only scan files whose name matches this glob (e.g. '*.c')
    #[arg(short = 'p', long, value_name = "GLOB")]
    pub pattern: Option<String>,

    /// Glob patterns to ignore (can be specified multiple times)
    ///
    /// These patterns are added to the root .gitignore and to any patterns
    /// from the config file.
    #[arg(short = 'i', long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Skip hidden files and directories (starting with .)
    #[arg(long, overrides_with = "no_skip_hidden")]
    pub skip_hidden: bool,

    /// Scan hidden files and directories even if the config skips them
    #[arg(long, overrides_with = "skip_hidden")]
    pub no_skip_hidden: bool,

    /// Follow symbolic links during the walk
    #[arg(long, overrides_with = "no_follow_symlinks")]
    pub follow_symlinks: bool,

    /// Do not follow symbolic links even if the config enables it
    #[arg(long, overrides_with = "follow_symlinks")]
    pub no_follow_symlinks: bool,

    /// Number of threads used for tokenizing [default: 4]
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Fail on the first file that cannot be read or tokenized
    #[arg(long, overrides_with = "no_strict")]
    pub strict: bool,

    /// Skip unreadable files even if the config enables strict mode
    #[arg(long, overrides_with = "strict")]
    pub no_strict: bool,

    /// Report format (defaults to the output file's extension, else text)
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Configuration file to use instead of the platform default
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// JSON document for tooling
    Json,
    /// One CSV row per occurrence
    Csv,
}

impl OutputFormat {
    /// Format implied by a file extension (`.json`, `.csv`, `.txt`).
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_args(cli: Cli) -> ScanArgs {
        match cli.command {
            Commands::Scan(args) => args,
            Commands::Languages => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_parse_help() {
        assert!(Cli::try_parse_from(["codedupe", "--help"]).is_err());
    }

    #[test]
    fn test_cli_parse_scan_basic() {
        let cli = Cli::try_parse_from(["codedupe", "scan", "src"]).unwrap();
        assert_eq!(cli.verbose, 0);
        let args = scan_args(cli);
        assert_eq!(args.paths, vec![PathBuf::from("src")]);
        assert!(args.min_tokens.is_none());
        assert!(args.min_lines.is_none());
        assert!(args.format.is_none());
        assert!(!args.fuzzy);
    }

    #[test]
    fn test_cli_parse_scan_with_options() {
        let cli = Cli::try_parse_from([
            "codedupe", "-v", "scan", "src", "lib/x.c", "-m", "50", "--lines", "5", "-z", "-p",
            "*.c", "-i", "vendor/", "--ignore", "*.gen.c", "-f", "json", "-o", "out.json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);

        let args = scan_args(cli);
        assert_eq!(args.paths.len(), 2);
        assert_eq!(args.min_tokens, Some(50));
        assert_eq!(args.min_lines, Some(5));
        assert!(args.fuzzy);
        assert_eq!(args.pattern.as_deref(), Some("*.c"));
        assert_eq!(args.ignore_patterns, vec!["vendor/", "*.gen.c"]);
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_cli_parse_scan_all_flags() {
        let cli = Cli::try_parse_from([
            "codedupe",
            "scan",
            ".",
            "--follow-symlinks",
            "--skip-hidden",
            "--io-threads",
            "8",
            "--strict",
            "--config",
            "my.toml",
        ])
        .unwrap();
        let args = scan_args(cli);
        assert!(args.follow_symlinks);
        assert!(args.skip_hidden);
        assert_eq!(args.io_threads, Some(8));
        assert!(args.strict);
        assert_eq!(args.config, Some(PathBuf::from("my.toml")));
    }

    #[test]
    fn test_cli_negated_switches() {
        let cli = Cli::try_parse_from([
            "codedupe",
            "scan",
            ".",
            "--no-fuzzy",
            "--no-skip-hidden",
            "--no-follow-symlinks",
            "--no-strict",
        ])
        .unwrap();
        let args = scan_args(cli);
        assert!(args.no_fuzzy && !args.fuzzy);
        assert!(args.no_skip_hidden && !args.skip_hidden);
        assert!(args.no_follow_symlinks && !args.follow_symlinks);
        assert!(args.no_strict && !args.strict);

        // The last of a pair wins
        let args = scan_args(Cli::try_parse_from(["codedupe", "scan", ".", "--no-fuzzy", "-z"]).unwrap());
        assert!(args.fuzzy);
        assert!(!args.no_fuzzy);
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["codedupe", "-v", "-q", "scan", "."]).is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["codedupe", "scan", ".", "--json-errors", "-q"]).unwrap();
        assert!(cli.json_errors);
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_missing_path() {
        assert!(Cli::try_parse_from(["codedupe", "scan"]).is_err());
    }

    #[test]
    fn test_cli_languages_subcommand() {
        let cli = Cli::try_parse_from(["codedupe", "languages"]).unwrap();
        assert!(matches!(cli.command, Commands::Languages));
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["codedupe", "scan", ".", "-f", "html"]).is_err());
    }

    #[test]
    fn test_output_format_from_extension() {
        assert_eq!(
            OutputFormat::from_extension(Path::new("r.JSON")),
            Some(OutputFormat::Json)
        );
        assert_eq!(
            OutputFormat::from_extension(Path::new("r.csv")),
            Some(OutputFormat::Csv)
        );
        assert_eq!(
            OutputFormat::from_extension(Path::new("r.txt")),
            Some(OutputFormat::Text)
        );
        assert_eq!(OutputFormat::from_extension(Path::new("r.html")), None);
        assert_eq!(OutputFormat::from_extension(Path::new("report")), None);
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }
}
