//! Journal store access.
//!
//! This module defines the seam between the view engine and the external log store:
//! - [`Journal`]: the store primitives the engine consumes (match, seek, step, read)
//! - [`JournalProvider`]: how a journal handle is obtained (local store, export file)
//! - [`updates`]: the "store updated" notification channel
//!
//! The store itself is an external collaborator. [`memory::MemoryStore`] is an
//! in-memory implementation used for fixtures and for export files.

use crate::model::error::{ProviderError, StoreError};
use crate::model::{BootId, Cursor};

pub mod export;
pub mod memory;
pub mod updates;

pub use export::ExportFileProvider;
pub use memory::{MemoryJournal, MemoryStore, Record};
pub use updates::{UpdateListener, UpdateNotifier};

/// Well-known journal field names.
pub mod fields {
    /// Message text.
    pub const MESSAGE: &str = "MESSAGE";
    /// Catalog id of the message.
    pub const MESSAGE_ID: &str = "MESSAGE_ID";
    /// Syslog level, `0`..`7`.
    pub const PRIORITY: &str = "PRIORITY";
    /// Boot the entry was logged in.
    pub const BOOT_ID: &str = "_BOOT_ID";
    /// System unit that logged the entry.
    pub const SYSTEMD_UNIT: &str = "_SYSTEMD_UNIT";
    /// User unit that logged the entry.
    pub const SYSTEMD_USER_UNIT: &str = "_SYSTEMD_USER_UNIT";
    /// Executable path of the logging process.
    pub const EXE: &str = "_EXE";
    /// How the entry reached the journal.
    pub const TRANSPORT: &str = "_TRANSPORT";

    /// Transports that carry kernel messages.
    pub const KERNEL_TRANSPORTS: &[&str] = &["kernel", "audit"];
    /// Transports that carry userspace messages.
    pub const USERSPACE_TRANSPORTS: &[&str] = &["journal", "syslog", "stdout", "driver"];
}

/// Direction in which the window grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards older entries.
    TowardsHead,
    /// Towards newer entries.
    TowardsTail,
}

impl Direction {
    /// The other direction.
    pub fn opposite(self) -> Self {
        match self {
            Direction::TowardsHead => Direction::TowardsTail,
            Direction::TowardsTail => Direction::TowardsHead,
        }
    }
}

/// Store primitives consumed by the fetch engine.
///
/// Mirrors the journal reading API: matches form a fixed four-level grammar
/// (conjunction of disjunctions of groups; within a group different fields AND,
/// repeated fields OR). Stepping returns `Ok(false)` when no further entry exists.
/// Every failure carries the store's negative status.
pub trait Journal {
    /// Remove all matches.
    fn flush_matches(&mut self);

    /// Add a `field=value` term to the current group.
    fn add_match(&mut self, field: &str, value: &str) -> Result<(), StoreError>;

    /// Close the current disjunction; following groups are AND-ed with it.
    fn add_conjunction(&mut self) -> Result<(), StoreError>;

    /// Close the current group; following terms are OR-ed with it.
    fn add_disjunction(&mut self) -> Result<(), StoreError>;

    /// Position before the first matching entry; the next step makes it current.
    fn seek_head(&mut self) -> Result<(), StoreError>;

    /// Position after the last matching entry; the previous step makes it current.
    fn seek_tail(&mut self) -> Result<(), StoreError>;

    /// Step to the next matching entry. `Ok(false)` at the tail.
    fn next(&mut self) -> Result<bool, StoreError>;

    /// Step to the previous matching entry. `Ok(false)` at the head.
    fn previous(&mut self) -> Result<bool, StoreError>;

    /// Cursor of the current entry.
    fn cursor(&self) -> Result<Cursor, StoreError>;

    /// Position near the entry identified by `cursor`; the next step makes it current.
    fn seek_cursor(&mut self, cursor: &Cursor) -> Result<(), StoreError>;

    /// Whether the current entry is the one identified by `cursor`.
    fn test_cursor(&self, cursor: &Cursor) -> Result<bool, StoreError>;

    /// Value of `name` on the current entry, `None` when the entry lacks it.
    fn field(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Wall-clock timestamp of the current entry in microseconds since the epoch.
    fn realtime_usec(&self) -> Result<u64, StoreError>;

    /// Monotonic timestamp of the current entry in microseconds since boot.
    fn monotonic_usec(&self) -> Result<u64, StoreError>;

    /// Distinct values of `field` across the whole store, ignoring matches.
    fn unique_values(&mut self, field: &str) -> Result<Vec<String>, StoreError>;

    /// Step one entry in `direction`.
    fn step(&mut self, direction: Direction) -> Result<bool, StoreError> {
        match direction {
            Direction::TowardsTail => self.next(),
            Direction::TowardsHead => self.previous(),
        }
    }
}

/// Source of journal handles.
///
/// Local system/user journals, export files and remote imports all sit behind
/// this interface; the view only needs to open a handle and know the current boot.
pub trait JournalProvider {
    /// Open a fresh handle on the store.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` when the store cannot be opened.
    fn open(&self) -> Result<Box<dyn Journal>, ProviderError>;

    /// Boot the store considers current, if any.
    fn current_boot_id(&self) -> Option<BootId>;

    /// Subscribe to "store updated" notifications. Static sources return `None`.
    fn subscribe(&self) -> Option<UpdateListener> {
        None
    }
}
