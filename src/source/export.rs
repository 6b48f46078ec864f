//! Export-file journal provider.
//!
//! Loads `journalctl -o json` output (one JSON object per line) into a
//! [`MemoryStore`]. Malformed lines are non-fatal: they are logged with their
//! line number and skipped, so a partially corrupt export still opens.

use crate::model::error::{ExportError, ProviderError};
use crate::model::BootId;
use crate::source::memory::{MemoryStore, Record};
use crate::source::{Journal, JournalProvider};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const REALTIME: &str = "__REALTIME_TIMESTAMP";
const MONOTONIC: &str = "__MONOTONIC_TIMESTAMP";

/// Journal provider backed by an export file read once at construction.
#[derive(Debug)]
pub struct ExportFileProvider {
    path: PathBuf,
    store: MemoryStore,
    skipped: usize,
}

impl ExportFileProvider {
    /// Read and parse the export at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::FileNotFound` if the file does not exist.
    /// Returns `ProviderError::Io` for other I/O errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ProviderError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Parse an export from any buffered reader. `origin` is used for logging.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Io` if reading fails.
    pub fn from_reader(reader: impl BufRead, origin: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let path = origin.into();
        let store = MemoryStore::with_id(store_id_for(&path));
        let mut records = Vec::new();
        let mut skipped = 0;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_export_line(&line, index + 1) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(path = %path.display(), %error, "Skipping malformed export line");
                    skipped += 1;
                }
            }
        }

        info!(
            path = %path.display(),
            entries = records.len(),
            skipped,
            "Loaded journal export"
        );
        store.extend(records);

        Ok(Self {
            path,
            store,
            skipped,
        })
    }

    /// Path the export was loaded from (`-` for stdin).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The store holding the parsed records.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Number of malformed lines that were skipped.
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }
}

impl JournalProvider for ExportFileProvider {
    fn open(&self) -> Result<Box<dyn Journal>, ProviderError> {
        debug!(path = %self.path.display(), "Opening export journal");
        self.store.open()
    }

    fn current_boot_id(&self) -> Option<BootId> {
        self.store.current_boot_id()
    }
}

/// Derive a stable store identifier from the file name.
fn store_id_for(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("export")
        .replace(';', "_")
}

/// Parse one export line into a record.
///
/// Field values may be strings, numbers, or byte arrays (used by journalctl
/// for binary-safe payloads). `null` values and `__`-prefixed address fields
/// other than the timestamps are dropped.
///
/// # Errors
///
/// Returns `ExportError` if the line is not a JSON object or lacks a usable
/// realtime timestamp.
pub fn parse_export_line(line: &str, line_no: usize) -> Result<Record, ExportError> {
    let value: Value = serde_json::from_str(line).map_err(|e| ExportError::InvalidJson {
        line: line_no,
        message: e.to_string(),
    })?;
    let Value::Object(object) = value else {
        return Err(ExportError::InvalidJson {
            line: line_no,
            message: "expected a JSON object".to_string(),
        });
    };

    let realtime = object
        .get(REALTIME)
        .ok_or(ExportError::MissingField {
            line: line_no,
            field: REALTIME,
        })
        .and_then(|v| parse_usec(v, line_no, REALTIME))?;
    let monotonic = match object.get(MONOTONIC) {
        Some(v) => parse_usec(v, line_no, MONOTONIC)?,
        None => 0,
    };

    let mut record = Record::new(realtime, monotonic);
    for (name, value) in &object {
        if name.starts_with("__") {
            continue;
        }
        if let Some(text) = field_text(value) {
            record = record.with_field(name.as_str(), text);
        }
    }
    Ok(record)
}

fn parse_usec(value: &Value, line: usize, field: &'static str) -> Result<u64, ExportError> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    parsed.ok_or_else(|| ExportError::InvalidTimestamp {
        line,
        field,
        raw: value.to_string(),
    })
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect();
            bytes.map(|b| String::from_utf8_lossy(&b).into_owned())
        }
        Value::Null | Value::Object(_) => None,
    }
}
