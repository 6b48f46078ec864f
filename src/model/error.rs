//! Error types for jlv.
//!
//! This module defines the error taxonomy using `thiserror`. Errors follow the
//! Railway-Oriented Programming pattern, composing via `?` and `From` conversions.
//!
//! # Error Hierarchy
//!
//! - [`AppError`] - Top-level error for the binary
//!   - [`ProviderError`] - Opening a journal (export file missing, unparsable, store closed)
//!   - [`ExportError`] - Malformed lines in a `journalctl -o json` export
//!   - [`StoreError`] - A single store primitive failed with an errno-style code
//!
//! # Error Recovery Strategy
//!
//! Store errors never reach the view layer. The fetch engine logs them and returns
//! empty results; the view only ever observes "no more data" or "no change". Only the
//! construction boundary (config, export loading, provider open) returns `Result`s.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error encompassing all fatal failure modes.
#[derive(Debug, Error)]
pub enum AppError {
    /// The journal could not be opened.
    #[error("Failed to open journal: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration file could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),

    /// Writing output failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

/// A store primitive reported failure.
///
/// The store signals failure through a negative status code in the style of
/// `-errno`. The operation name is kept so log lines say which call failed.
///
/// # Examples
///
/// ```
/// use jlv::model::error::StoreError;
///
/// let err = StoreError::new("seek_cursor", -22);
/// assert_eq!(err.errno(), 22);
/// assert!(err.to_string().contains("seek_cursor"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("journal operation {op} failed with status {status}")]
pub struct StoreError {
    op: &'static str,
    status: i32,
}

/// `EINVAL`, reported for malformed arguments such as unknown cursors.
pub const EINVAL: i32 = 22;
/// `EIO`, reported for injected read failures.
pub const EIO: i32 = 5;
/// `EADDRNOTAVAIL`, reported when no entry is current.
pub const EADDRNOTAVAIL: i32 = 99;

impl StoreError {
    /// Create from an operation name and a signed status.
    ///
    /// Positive codes are normalized to negative so callers may pass either.
    pub fn new(op: &'static str, status: i32) -> Self {
        Self {
            op,
            status: -status.abs(),
        }
    }

    /// Name of the primitive that failed, e.g. `seek_cursor`.
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// The negative status as returned by the store.
    pub fn status(&self) -> i32 {
        self.status
    }

    /// The positive OS error code.
    pub fn errno(&self) -> i32 {
        -self.status
    }
}

/// Errors encountered when opening a journal through a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The export file does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was attempted.
        path: PathBuf,
    },

    /// The store refused to open or has gone away.
    #[error("Journal unavailable: {0}")]
    Unavailable(String),

    /// A line of the export could not be parsed.
    #[error("Malformed export: {0}")]
    Export(#[from] ExportError),

    /// Generic I/O error while reading the source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors encountered when parsing a `journalctl -o json` export line.
///
/// Malformed lines are skipped by the loader; these errors are logged with the
/// 1-based line number so users can find the offending record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// Line is not valid JSON or not a JSON object.
    #[error("Invalid JSON at line {line}: {message}")]
    InvalidJson {
        /// 1-based line number.
        line: usize,
        /// Parser message.
        message: String,
    },

    /// A mandatory field is missing.
    #[error("Missing required field '{field}' at line {line}")]
    MissingField {
        /// 1-based line number.
        line: usize,
        /// Field name such as `__REALTIME_TIMESTAMP`.
        field: &'static str,
    },

    /// A timestamp field is not an unsigned microsecond count.
    #[error("Invalid timestamp in '{field}' at line {line}: {raw}")]
    InvalidTimestamp {
        /// 1-based line number.
        line: usize,
        /// Field name.
        field: &'static str,
        /// The raw value found.
        raw: String,
    },
}
