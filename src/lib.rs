//! CodeDupe - token-based duplicate source code detector
//!
//! Finds blocks of source code that occur more than once, within a file or
//! across files. Every file is lexed into tokens, each token is reduced to a
//! one-byte hash, and a Rabin-Karp rolling hash over a window of `N` tokens
//! proposes candidate duplicates that are then verified token by token and
//! extended to their full length.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use codedupe::detect::{DuplicateFinder, FinderConfig};
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_min_tokens(50));
//! let (groups, summary) = finder.find_duplicates(&[PathBuf::from("src")]).unwrap();
//! for group in &groups {
//!     println!("{} lines x {}", group.matched_lines(), group.len());
//! }
//! println!("{} files scanned", summary.tokenized_files);
//! ```

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod tokens;

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, Commands, ScanArgs};
use crate::config::Config;
use crate::detect::DuplicateFinder;
use crate::error::ExitCode;
use crate::output::{write_languages, write_report};
use crate::progress::{Progress, ProgressCallback};
use crate::tokens::LexerRegistry;

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error if the scan fails or the report cannot be written.
/// An interrupted scan surfaces as [`detect::FinderError::Interrupted`].
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Commands::Languages => {
            let registry = LexerRegistry::with_builtin_languages();
            let mut stdout = io::stdout().lock();
            write_languages(&mut stdout, registry.languages())?;
            Ok(ExitCode::Success)
        }
        Commands::Scan(args) => {
            let use_color = !cli.no_color && io::stdout().is_terminal();
            run_scan(args, cli.quiet, use_color)
        }
    }
}

fn run_scan(args: &ScanArgs, quiet: bool, use_color: bool) -> anyhow::Result<ExitCode> {
    let mut config = Config::load_from_path(args.config.as_deref());
    config.apply_scan_args(args);
    log::debug!("Effective configuration: {:?}", config);

    let handler = signal::install_handler()?;
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(quiet));
    let finder_config = config
        .finder_config()
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress);

    let finder = DuplicateFinder::new(finder_config);
    let (groups, summary) = finder.find_duplicates(&args.paths)?;
    let exit_code = ExitCode::for_scan(groups.len(), summary.has_errors());

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create report file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_report(&mut writer, config.format, &groups, &summary, exit_code, false)?;
            writer.flush()?;
            log::info!("Report written to {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            write_report(&mut stdout, config.format, &groups, &summary, exit_code, use_color)?;
        }
    }

    Ok(exit_code)
}
