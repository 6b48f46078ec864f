//! Cursor window buffer.
//!
//! An ordered, gap-free run of journal entries with head/tail reached flags.
//! Entries are only added at the edges and only removed by [`WindowBuffer::clear`].

use crate::model::{Cursor, LogEntry};
use crate::source::Direction;
use std::collections::{HashSet, VecDeque};
use tracing::warn;

/// Entries read per directional fetch unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// In-memory window over the journal.
///
/// Invariant: no two entries share a cursor; order is arrival order
/// (oldest at the front).
#[derive(Debug)]
pub struct WindowBuffer {
    entries: VecDeque<LogEntry>,
    cursors: HashSet<Cursor>,
    head_reached: bool,
    tail_reached: bool,
    chunk_size: usize,
}

impl Default for WindowBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl WindowBuffer {
    /// Create an empty buffer.
    ///
    /// A zero chunk size is clamped to 1 here; [`set_chunk_size`](Self::set_chunk_size)
    /// rejects zero instead.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursors: HashSet::new(),
            head_reached: false,
            tail_reached: false,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, oldest first.
    pub fn get(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    /// Buffered entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Entry at the edge that grows when extending in `direction`.
    pub fn edge(&self, direction: Direction) -> Option<&LogEntry> {
        match direction {
            Direction::TowardsHead => self.entries.front(),
            Direction::TowardsTail => self.entries.back(),
        }
    }

    /// Whether an entry with `cursor` is buffered.
    pub fn contains(&self, cursor: &Cursor) -> bool {
        self.cursors.contains(cursor)
    }

    /// The oldest matching entry is buffered.
    pub fn head_reached(&self) -> bool {
        self.head_reached
    }

    /// The newest matching entry is buffered.
    pub fn tail_reached(&self) -> bool {
        self.tail_reached
    }

    /// Reached flag for the edge that grows in `direction`.
    pub fn reached(&self, direction: Direction) -> bool {
        match direction {
            Direction::TowardsHead => self.head_reached,
            Direction::TowardsTail => self.tail_reached,
        }
    }

    /// Set the reached flag for the edge that grows in `direction`.
    pub fn set_reached(&mut self, direction: Direction, reached: bool) {
        match direction {
            Direction::TowardsHead => self.head_reached = reached,
            Direction::TowardsTail => self.tail_reached = reached,
        }
    }

    /// Both ends of the store have been seen.
    pub fn is_complete(&self) -> bool {
        self.head_reached && self.tail_reached
    }

    /// Maximum entries read per directional fetch.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Change the chunk size. Returns `false` and keeps the old size for zero.
    pub fn set_chunk_size(&mut self, chunk_size: usize) -> bool {
        if chunk_size == 0 {
            return false;
        }
        self.chunk_size = chunk_size;
        true
    }

    /// Drop all entries and forget both reached flags.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursors.clear();
        self.head_reached = false;
        self.tail_reached = false;
    }

    /// Add entries at the edge for `direction`, in the order they were read.
    ///
    /// Tail-ward reads arrive oldest first and go to the back; head-ward reads
    /// arrive newest first and go to the front, so the buffer stays ascending.
    /// Entries whose cursor is already buffered are dropped. Returns how many
    /// entries were added.
    pub fn extend(&mut self, direction: Direction, entries: Vec<LogEntry>) -> usize {
        let mut added = 0;
        for entry in entries {
            if !self.cursors.insert(entry.cursor().clone()) {
                warn!(cursor = %entry.cursor(), "Dropping duplicate entry");
                continue;
            }
            match direction {
                Direction::TowardsHead => self.entries.push_front(entry),
                Direction::TowardsTail => self.entries.push_back(entry),
            }
            added += 1;
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn entry(n: u32) -> LogEntry {
        LogEntry::new(
            Cursor::new(format!("i={:x}", n)).expect("valid cursor"),
            Utc.timestamp_opt(i64::from(n), 0).single().expect("valid time"),
            Duration::from_secs(u64::from(n)),
        )
        .with_message(format!("m{}", n))
    }

    fn messages(buffer: &WindowBuffer) -> Vec<&str> {
        buffer.iter().map(LogEntry::message).collect()
    }

    #[test]
    fn tail_extension_appends_in_read_order() {
        let mut buffer = WindowBuffer::new(10);
        assert_eq!(buffer.extend(Direction::TowardsTail, vec![entry(1), entry(2)]), 2);
        assert_eq!(buffer.extend(Direction::TowardsTail, vec![entry(3)]), 1);
        assert_eq!(messages(&buffer), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn head_extension_prepends_descending_reads() {
        let mut buffer = WindowBuffer::new(10);
        buffer.extend(Direction::TowardsTail, vec![entry(5)]);
        buffer.extend(Direction::TowardsHead, vec![entry(4), entry(3)]);
        assert_eq!(messages(&buffer), vec!["m3", "m4", "m5"]);
        assert_eq!(buffer.edge(Direction::TowardsHead).map(LogEntry::message), Some("m3"));
        assert_eq!(buffer.edge(Direction::TowardsTail).map(LogEntry::message), Some("m5"));
    }

    #[test]
    fn duplicate_cursors_are_dropped() {
        let mut buffer = WindowBuffer::new(10);
        buffer.extend(Direction::TowardsTail, vec![entry(1), entry(2)]);
        let added = buffer.extend(Direction::TowardsTail, vec![entry(2), entry(3)]);
        assert_eq!(added, 1);
        assert_eq!(messages(&buffer), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn clear_resets_entries_and_flags() {
        let mut buffer = WindowBuffer::new(10);
        buffer.extend(Direction::TowardsTail, vec![entry(1)]);
        buffer.set_reached(Direction::TowardsHead, true);
        buffer.set_reached(Direction::TowardsTail, true);
        assert!(buffer.is_complete());

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.head_reached());
        assert!(!buffer.tail_reached());
        assert!(!buffer.contains(entry(1).cursor()));
    }

    #[test]
    fn construction_clamps_zero_chunk_size_and_setter_rejects_it() {
        let mut buffer = WindowBuffer::new(0);
        assert_eq!(buffer.chunk_size(), 1);
        assert!(!buffer.set_chunk_size(0));
        assert!(buffer.set_chunk_size(25));
        assert_eq!(buffer.chunk_size(), 25);
    }
}
