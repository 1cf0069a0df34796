//! Exit codes and structured error reporting.

use serde::Serialize;

use crate::detect::FinderError;

/// Process exit codes.
///
/// - 0: duplicates were found
/// - 1: general error
/// - 2: scan completed, no duplicates
/// - 3: duplicates reported, but some files could not be walked or tokenized
/// - 130: interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Scan completed and duplicates were found.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Scan completed but no duplicates were found.
    NoDuplicates = 2,
    /// Scan completed but some files were skipped because of errors.
    PartialSuccess = 3,
    /// Scan was interrupted by user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "CD000",
            Self::GeneralError => "CD001",
            Self::NoDuplicates => "CD002",
            Self::PartialSuccess => "CD003",
            Self::Interrupted => "CD130",
        }
    }

    /// Exit code for a finished scan.
    ///
    /// Errors only downgrade a run that found something; a run with no
    /// duplicates reports that first.
    #[must_use]
    pub fn for_scan(duplicate_groups: usize, had_errors: bool) -> Self {
        match (duplicate_groups, had_errors) {
            (0, _) => Self::NoDuplicates,
            (_, true) => Self::PartialSuccess,
            (_, false) => Self::Success,
        }
    }

    /// Exit code for an error that ended the run.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<FinderError>() {
            Some(FinderError::Interrupted) => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "CD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
