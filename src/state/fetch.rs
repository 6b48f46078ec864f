//! Bidirectional fetch engine.
//!
//! Reads chunks of entries from the journal into the [`WindowBuffer`],
//! repositioning the store at the buffer edge via its cursor before each read.
//!
//! Cursor seeks are validated: some journal versions land on the wrong entry
//! after a cursor seek. On mismatch the engine falls back to a linear scan from
//! the head. That path is O(n) in the store size and logged at `warn`.

use crate::filter::{compile, ApplyReport};
use crate::model::error::StoreError;
use crate::model::{BootId, Cursor, FilterSpec, LogEntry, Priority};
use crate::source::{fields, Direction, Journal};
use crate::state::window::WindowBuffer;
use chrono::DateTime;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

/// Entries added at each edge by one fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// Entries prepended towards the head.
    pub head: usize,
    /// Entries appended towards the tail.
    pub tail: usize,
}

impl FetchResult {
    /// Entries added at both edges.
    pub fn total(&self) -> usize {
        self.head + self.tail
    }

    /// Nothing was added.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Entries added at the edge that grows in `direction`.
    pub fn added(&self, direction: Direction) -> usize {
        match direction {
            Direction::TowardsHead => self.head,
            Direction::TowardsTail => self.tail,
        }
    }
}

/// Failure to position the journal at a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeekError {
    /// A store primitive failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Neither the direct seek nor the linear scan found the entry.
    #[error("cursor {0} not found in journal")]
    NotFound(Cursor),
}

/// How a chunk read ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkEnd {
    /// Chunk size exhausted; more entries may follow.
    Full,
    /// The store reported no further entry.
    Exhausted,
    /// A step or read failed; nothing is known about what follows.
    Failed,
}

/// Owns the journal handle and the window it fills.
pub struct FetchEngine {
    journal: Option<Box<dyn Journal>>,
    window: WindowBuffer,
}

impl std::fmt::Debug for FetchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchEngine")
            .field("available", &self.journal.is_some())
            .field("window", &self.window)
            .finish()
    }
}

impl FetchEngine {
    /// Engine reading from `journal` with an empty window.
    pub fn new(journal: Box<dyn Journal>, chunk_size: usize) -> Self {
        Self {
            journal: Some(journal),
            window: WindowBuffer::new(chunk_size),
        }
    }

    /// Engine without a store; every read is a no-op.
    pub fn unavailable(chunk_size: usize) -> Self {
        Self {
            journal: None,
            window: WindowBuffer::new(chunk_size),
        }
    }

    /// Whether a journal handle is held.
    pub fn is_available(&self) -> bool {
        self.journal.is_some()
    }

    /// The buffered window.
    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }

    /// Mutable access to the window, for flag and chunk size changes.
    pub fn window_mut(&mut self) -> &mut WindowBuffer {
        &mut self.window
    }

    /// The journal handle, for queries that bypass the window.
    pub fn journal_mut(&mut self) -> Option<&mut (dyn Journal + 'static)> {
        self.journal.as_deref_mut()
    }

    /// Clear the window and replace the store's matches with `spec`.
    pub fn apply_filter(&mut self, spec: &FilterSpec) -> ApplyReport {
        self.window.clear();
        match self.journal.as_deref_mut() {
            Some(journal) => compile(spec, journal),
            None => ApplyReport::default(),
        }
    }

    /// Clear the window and read one chunk from the head.
    pub fn seek_head(&mut self) -> usize {
        self.window.clear();
        self.extend(Direction::TowardsTail)
    }

    /// Clear the window and read one chunk from the tail.
    pub fn seek_tail(&mut self) -> usize {
        self.window.clear();
        self.extend(Direction::TowardsHead)
    }

    /// Grow the window at both edges. Edges already at the store's end are skipped.
    pub fn fetch_both(&mut self) -> FetchResult {
        let tail = if self.window.tail_reached() {
            0
        } else {
            self.extend(Direction::TowardsTail)
        };
        let head = if self.window.head_reached() {
            0
        } else {
            self.extend(Direction::TowardsHead)
        };
        FetchResult { head, tail }
    }

    /// Read the next chunk in `direction` and add it to the window.
    pub fn extend(&mut self, direction: Direction) -> usize {
        let entries = self.read_entries(direction);
        let added = self.window.extend(direction, entries);
        debug!(?direction, added, total = self.window.len(), "Window extended");
        added
    }

    /// Read the next chunk in `direction` without touching the buffered entries.
    ///
    /// With an empty window the journal is positioned at the opposite extreme
    /// (head for tail-ward reads, tail for head-ward reads) and that flag is set.
    /// Otherwise the journal is positioned on the buffered edge entry, so the
    /// first step yields the entry beyond it. Reaching the store's end sets the
    /// reached flag for `direction`.
    pub fn read_entries(&mut self, direction: Direction) -> Vec<LogEntry> {
        let Some(journal) = self.journal.as_deref_mut() else {
            return Vec::new();
        };
        let chunk_size = self.window.chunk_size();
        let mut entries = Vec::new();

        match self.window.edge(direction).map(|e| e.cursor().clone()) {
            Some(cursor) => {
                if let Err(err) = seek_cursor(journal, &cursor) {
                    error!(%cursor, error = %err, "Cannot reposition journal at window edge; read aborted");
                    return Vec::new();
                }
            }
            None => {
                let positioned = match direction {
                    Direction::TowardsTail => seek_head_and_make_current(journal),
                    Direction::TowardsHead => seek_tail_and_make_current(journal),
                };
                match positioned {
                    Err(err) => {
                        warn!(?direction, error = %err, "Failed to seek journal extreme");
                        return Vec::new();
                    }
                    Ok(false) => {
                        debug!("Journal has no entries matching the filter");
                        self.window.set_reached(Direction::TowardsHead, true);
                        self.window.set_reached(Direction::TowardsTail, true);
                        return Vec::new();
                    }
                    Ok(true) => {
                        self.window.set_reached(direction.opposite(), true);
                        match read_current_entry(journal) {
                            Ok(entry) => entries.push(entry),
                            Err(err) => {
                                warn!(error = %err, "Failed to read entry at journal extreme");
                                return Vec::new();
                            }
                        }
                    }
                }
            }
        }

        let end = step_and_collect(journal, direction, chunk_size, &mut entries);
        if end == ChunkEnd::Exhausted {
            self.window.set_reached(direction, true);
        }
        trace!(?direction, read = entries.len(), ?end, "Chunk read");
        entries
    }

    /// Position the journal on the entry identified by `cursor`.
    ///
    /// # Errors
    ///
    /// Returns `SeekError` when the store is unavailable, a primitive fails, or
    /// the entry cannot be found even by linear scan.
    pub fn seek_cursor(&mut self, cursor: &Cursor) -> Result<(), SeekError> {
        match self.journal.as_deref_mut() {
            Some(journal) => seek_cursor(journal, cursor),
            None => Err(SeekError::NotFound(cursor.clone())),
        }
    }

    /// Read up to one chunk in `direction` from the journal's current position.
    ///
    /// The window is not consulted or modified.
    pub fn read_chunk(&mut self, direction: Direction) -> Vec<LogEntry> {
        let chunk_size = self.window.chunk_size();
        let mut entries = Vec::new();
        if let Some(journal) = self.journal.as_deref_mut() {
            step_and_collect(journal, direction, chunk_size, &mut entries);
        }
        entries
    }
}

/// Step in `direction` until `entries` holds `limit` items or the store ends.
fn step_and_collect(
    journal: &mut dyn Journal,
    direction: Direction,
    limit: usize,
    entries: &mut Vec<LogEntry>,
) -> ChunkEnd {
    while entries.len() < limit {
        match journal.step(direction) {
            Ok(true) => match read_current_entry(journal) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!(error = %err, "Failed to read journal entry; chunk truncated");
                    return ChunkEnd::Failed;
                }
            },
            Ok(false) => return ChunkEnd::Exhausted,
            Err(err) => {
                warn!(?direction, error = %err, "Journal step failed; chunk truncated");
                return ChunkEnd::Failed;
            }
        }
    }
    ChunkEnd::Full
}

/// Seek to the head and make the first matching entry current.
///
/// Returns `Ok(false)` when no entry matches.
pub fn seek_head_and_make_current(journal: &mut dyn Journal) -> Result<bool, StoreError> {
    journal.seek_head()?;
    journal.next()
}

/// Seek to the tail and make the last matching entry current.
///
/// Returns `Ok(false)` when no entry matches.
pub fn seek_tail_and_make_current(journal: &mut dyn Journal) -> Result<bool, StoreError> {
    journal.seek_tail()?;
    journal.previous()
}

/// Seek to `cursor`, make it current and validate the landing position.
///
/// Falls back to a linear scan from the head when validation fails.
///
/// # Errors
///
/// Returns `SeekError::Store` if a primitive fails and `SeekError::NotFound`
/// if the linear scan exhausts the store.
pub fn seek_cursor(journal: &mut dyn Journal, cursor: &Cursor) -> Result<(), SeekError> {
    journal.seek_cursor(cursor)?;
    if journal.next()? && journal.test_cursor(cursor)? {
        return Ok(());
    }

    warn!(%cursor, "Cursor seek landed on a different entry; scanning from head");
    journal.seek_head()?;
    let mut scanned = 0usize;
    while journal.next()? {
        scanned += 1;
        if journal.test_cursor(cursor)? {
            warn!(%cursor, scanned, "Cursor recovered by linear scan");
            return Ok(());
        }
    }
    Err(SeekError::NotFound(cursor.clone()))
}

/// Build a [`LogEntry`] from the journal's current entry.
///
/// # Errors
///
/// Returns `StoreError` if the cursor, timestamps or any field cannot be read.
pub fn read_current_entry(journal: &dyn Journal) -> Result<LogEntry, StoreError> {
    let cursor = journal.cursor()?;
    let realtime_usec = journal.realtime_usec()?;
    let realtime = i64::try_from(realtime_usec)
        .ok()
        .and_then(DateTime::from_timestamp_micros)
        .unwrap_or_default();
    let monotonic = Duration::from_micros(journal.monotonic_usec()?);

    let mut entry = LogEntry::new(cursor, realtime, monotonic)
        .with_message(journal.field(fields::MESSAGE)?.unwrap_or_default());
    if let Some(id) = journal.field(fields::MESSAGE_ID)? {
        entry = entry.with_message_id(id);
    }
    let unit = match journal.field(fields::SYSTEMD_UNIT)? {
        Some(unit) => Some(unit),
        None => journal.field(fields::SYSTEMD_USER_UNIT)?,
    };
    if let Some(unit) = unit {
        entry = entry.with_unit(unit);
    }
    if let Some(boot) = journal.field(fields::BOOT_ID)?.and_then(|b| BootId::new(b).ok()) {
        entry = entry.with_boot_id(boot);
    }
    if let Some(exe) = journal.field(fields::EXE)? {
        entry = entry.with_exe(exe);
    }
    if let Some(transport) = journal.field(fields::TRANSPORT)? {
        entry = entry.with_transport(transport);
    }
    if let Some(priority) = journal
        .field(fields::PRIORITY)?
        .and_then(|p| Priority::parse_field(&p))
    {
        entry = entry.with_priority(priority);
    }
    Ok(entry)
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
