//! In-memory journal store.
//!
//! [`MemoryStore`] holds records in arrival order and hands out [`MemoryJournal`]
//! handles that implement the full [`Journal`] contract: the four-level match
//! grammar, head/tail/cursor seeking and unique-value queries.
//!
//! The store can inject failures ([`Faults`]) and simulate the seek-cursor defect
//! of some journal versions, where the position after a cursor seek does not match
//! the requested entry. It also records every match call for inspection.

use crate::model::error::{ProviderError, StoreError, EADDRNOTAVAIL, EINVAL, EIO};
use crate::model::{BootId, Cursor};
use crate::source::updates::{self, UpdateListener, UpdateNotifier};
use crate::source::{fields, Journal, JournalProvider};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ===== Record =====

/// One stored journal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    seqnum: u64,
    realtime_usec: u64,
    monotonic_usec: u64,
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Create a record without fields. The sequence number is assigned on append.
    pub fn new(realtime_usec: u64, monotonic_usec: u64) -> Self {
        Self {
            seqnum: 0,
            realtime_usec,
            monotonic_usec,
            fields: BTreeMap::new(),
        }
    }

    /// Set `name` to `value`, replacing any earlier value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Value of `name`, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Position in the store, starting at 1; 0 until appended.
    pub fn seqnum(&self) -> u64 {
        self.seqnum
    }

    /// Wall-clock timestamp in microseconds since the epoch.
    pub fn realtime_usec(&self) -> u64 {
        self.realtime_usec
    }

    /// Microseconds since boot.
    pub fn monotonic_usec(&self) -> u64 {
        self.monotonic_usec
    }

    fn cursor_string(&self, store_id: &str) -> String {
        format!(
            "s={};i={:x};b={};m={:x};t={:x}",
            store_id,
            self.seqnum,
            self.field(fields::BOOT_ID).unwrap_or("-"),
            self.monotonic_usec,
            self.realtime_usec
        )
    }
}

/// Extract the sequence number from a cursor produced by this store.
fn cursor_seqnum(cursor: &Cursor) -> Option<u64> {
    cursor
        .as_str()
        .split(';')
        .find_map(|part| part.strip_prefix("i="))
        .and_then(|hex| u64::from_str_radix(hex, 16).ok())
}

// ===== Faults and call accounting =====

/// Failure injection knobs shared by all handles of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults {
    /// `add_match` fails for these `(field, value)` pairs.
    pub failing_matches: Vec<(String, String)>,
    /// `seek_head` fails with `EIO`.
    pub fail_seek_head: bool,
    /// `seek_tail` fails with `EIO`.
    pub fail_seek_tail: bool,
    /// `seek_cursor` fails with `EIO`.
    pub fail_seek_cursor: bool,
    /// Steps fail once this many successful steps have been taken.
    pub fail_steps_after: Option<usize>,
    /// A cursor seek lands this many entries away from the requested one.
    pub seek_cursor_skew: i64,
}

/// Counters of positioning calls made against a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    /// `seek_head` calls.
    pub seek_head: usize,
    /// `seek_tail` calls.
    pub seek_tail: usize,
    /// `seek_cursor` calls.
    pub seek_cursor: usize,
    /// `next` and `previous` calls.
    pub steps: usize,
}

/// One call against the match API, as recorded by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchCall {
    /// `flush_matches`.
    Flush,
    /// `add_match(field, value)`.
    Match {
        /// Field name.
        field: String,
        /// Value matched.
        value: String,
    },
    /// `add_conjunction`.
    Conjunction,
    /// `add_disjunction`.
    Disjunction,
}

// ===== MemoryStore =====

#[derive(Debug)]
struct StoreInner {
    id: String,
    records: Vec<Record>,
    notifiers: Vec<UpdateNotifier>,
    faults: Faults,
    stats: CallStats,
    match_log: Vec<MatchCall>,
    closed: bool,
}

/// Shared in-memory store. Cloning yields another handle on the same data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store with the default store id.
    pub fn new() -> Self {
        Self::with_id("mem")
    }

    /// Create a store whose cursors carry `id` as their store identifier.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                id: id.into(),
                records: Vec::new(),
                notifiers: Vec::new(),
                faults: Faults::default(),
                stats: CallStats::default(),
                match_log: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Store pre-filled with `records`, in order.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        store.extend(records);
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one record and notify subscribers.
    pub fn append(&self, record: Record) {
        self.extend(std::iter::once(record));
    }

    /// Append records in order and notify subscribers once.
    pub fn extend(&self, records: impl IntoIterator<Item = Record>) {
        let mut inner = self.write();
        let before = inner.records.len();
        for mut record in records {
            record.seqnum = inner.records.len() as u64 + 1;
            inner.records.push(record);
        }
        if inner.records.len() != before {
            inner.notifiers.retain(UpdateNotifier::notify);
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    /// True when the store has no records.
    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// Snapshot of all records in arrival order.
    pub fn records(&self) -> Vec<Record> {
        self.read().records.clone()
    }

    /// Replace the failure injection settings.
    pub fn set_faults(&self, faults: Faults) {
        self.write().faults = faults;
    }

    /// Positioning calls made since creation or the last reset.
    pub fn stats(&self) -> CallStats {
        self.read().stats
    }

    /// Zero the call counters.
    pub fn reset_stats(&self) {
        self.write().stats = CallStats::default();
    }

    /// Every match call issued against any handle of this store.
    pub fn match_log(&self) -> Vec<MatchCall> {
        self.read().match_log.clone()
    }

    /// Forget recorded match calls.
    pub fn clear_match_log(&self) {
        self.write().match_log.clear();
    }

    /// Make further `open` calls fail, as if the store had gone away.
    pub fn close(&self) {
        self.write().closed = true;
    }

    /// Open a handle positioned before the head, with no matches.
    pub fn open_journal(&self) -> MemoryJournal {
        MemoryJournal {
            store: self.clone(),
            groups: vec![vec![Vec::new()]],
            location: Location::Head,
        }
    }
}

impl JournalProvider for MemoryStore {
    fn open(&self) -> Result<Box<dyn Journal>, ProviderError> {
        let inner = self.read();
        if inner.closed {
            return Err(ProviderError::Unavailable(format!(
                "memory store '{}' is closed",
                inner.id
            )));
        }
        drop(inner);
        Ok(Box::new(self.open_journal()))
    }

    fn current_boot_id(&self) -> Option<BootId> {
        self.read()
            .records
            .iter()
            .rev()
            .find_map(|r| r.field(fields::BOOT_ID))
            .and_then(|id| BootId::new(id).ok())
    }

    fn subscribe(&self) -> Option<UpdateListener> {
        let (tx, rx) = updates::channel();
        self.write().notifiers.push(tx);
        Some(rx)
    }
}

// ===== MemoryJournal =====

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Head,
    Tail,
    /// Pending cursor seek: the next step lands at or around this sequence number.
    Seek(u64),
    /// Current entry by index.
    At(usize),
}

/// One `field=value` term.
type Term = (String, String);

/// A handle on a [`MemoryStore`] with its own matches and position.
#[derive(Debug)]
pub struct MemoryJournal {
    store: MemoryStore,
    /// Conjunction of disjunctions of groups.
    groups: Vec<Vec<Vec<Term>>>,
    location: Location,
}

impl MemoryJournal {
    fn log_call(&self, call: MatchCall) {
        self.store.write().match_log.push(call);
    }

    fn matches(&self, record: &Record) -> bool {
        self.groups.iter().all(|disjunction| {
            let active: Vec<&Vec<Term>> = disjunction.iter().filter(|g| !g.is_empty()).collect();
            active.is_empty() || active.iter().any(|group| group_matches(group, record))
        })
    }

    fn count_step(&self) -> Result<(), StoreError> {
        let mut inner = self.store.write();
        if let Some(limit) = inner.faults.fail_steps_after {
            if inner.stats.steps >= limit {
                return Err(StoreError::new("step", EIO));
            }
        }
        inner.stats.steps += 1;
        Ok(())
    }

    fn current(&self) -> Result<Record, StoreError> {
        match self.location {
            Location::At(index) => self
                .store
                .read()
                .records
                .get(index)
                .cloned()
                .ok_or_else(|| StoreError::new("current", EADDRNOTAVAIL)),
            _ => Err(StoreError::new("current", EADDRNOTAVAIL)),
        }
    }
}

/// Different fields AND together, repeated fields OR together.
fn group_matches(group: &[Term], record: &Record) -> bool {
    let mut by_field: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (field, value) in group {
        by_field.entry(field).or_default().push(value);
    }
    by_field
        .iter()
        .all(|(field, values)| record.field(field).is_some_and(|v| values.contains(&v)))
}

impl Journal for MemoryJournal {
    fn flush_matches(&mut self) {
        self.groups = vec![vec![Vec::new()]];
        self.log_call(MatchCall::Flush);
    }

    fn add_match(&mut self, field: &str, value: &str) -> Result<(), StoreError> {
        if field.is_empty() {
            return Err(StoreError::new("add_match", EINVAL));
        }
        let failing = self
            .store
            .read()
            .faults
            .failing_matches
            .iter()
            .any(|(f, v)| f == field && v == value);
        if failing {
            return Err(StoreError::new("add_match", EIO));
        }
        if let Some(group) = self.groups.last_mut().and_then(|d| d.last_mut()) {
            group.push((field.to_string(), value.to_string()));
        }
        self.log_call(MatchCall::Match {
            field: field.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn add_conjunction(&mut self) -> Result<(), StoreError> {
        let current_has_terms = self
            .groups
            .last()
            .is_some_and(|d| d.iter().any(|g| !g.is_empty()));
        if current_has_terms {
            self.groups.push(vec![Vec::new()]);
        }
        self.log_call(MatchCall::Conjunction);
        Ok(())
    }

    fn add_disjunction(&mut self) -> Result<(), StoreError> {
        if let Some(disjunction) = self.groups.last_mut() {
            if disjunction.last().is_some_and(|g| !g.is_empty()) {
                disjunction.push(Vec::new());
            }
        }
        self.log_call(MatchCall::Disjunction);
        Ok(())
    }

    fn seek_head(&mut self) -> Result<(), StoreError> {
        let mut inner = self.store.write();
        inner.stats.seek_head += 1;
        if inner.faults.fail_seek_head {
            return Err(StoreError::new("seek_head", EIO));
        }
        self.location = Location::Head;
        Ok(())
    }

    fn seek_tail(&mut self) -> Result<(), StoreError> {
        let mut inner = self.store.write();
        inner.stats.seek_tail += 1;
        if inner.faults.fail_seek_tail {
            return Err(StoreError::new("seek_tail", EIO));
        }
        self.location = Location::Tail;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, StoreError> {
        self.count_step()?;
        let found = {
            let inner = self.store.read();
            let start = match self.location {
                Location::Head => 0,
                Location::Tail => inner.records.len(),
                Location::Seek(seqnum) => {
                    inner.records.partition_point(|r| r.seqnum < seqnum)
                }
                Location::At(index) => index + 1,
            };
            (start..inner.records.len()).find(|&i| self.matches(&inner.records[i]))
        };
        Ok(match found {
            Some(index) => {
                self.location = Location::At(index);
                true
            }
            None => false,
        })
    }

    fn previous(&mut self) -> Result<bool, StoreError> {
        self.count_step()?;
        let found = {
            let inner = self.store.read();
            let end = match self.location {
                Location::Head => 0,
                Location::Tail => inner.records.len(),
                Location::Seek(seqnum) => {
                    inner.records.partition_point(|r| r.seqnum <= seqnum)
                }
                Location::At(index) => index,
            };
            (0..end).rev().find(|&i| self.matches(&inner.records[i]))
        };
        Ok(match found {
            Some(index) => {
                self.location = Location::At(index);
                true
            }
            None => false,
        })
    }

    fn cursor(&self) -> Result<Cursor, StoreError> {
        let record = self.current()?;
        let id = self.store.read().id.clone();
        Cursor::new(record.cursor_string(&id)).map_err(|_| StoreError::new("cursor", EINVAL))
    }

    fn seek_cursor(&mut self, cursor: &Cursor) -> Result<(), StoreError> {
        let mut inner = self.store.write();
        inner.stats.seek_cursor += 1;
        if inner.faults.fail_seek_cursor {
            return Err(StoreError::new("seek_cursor", EIO));
        }
        let seqnum = cursor_seqnum(cursor).ok_or_else(|| StoreError::new("seek_cursor", EINVAL))?;
        let landed = (seqnum as i64).saturating_add(inner.faults.seek_cursor_skew).max(1);
        self.location = Location::Seek(landed as u64);
        Ok(())
    }

    fn test_cursor(&self, cursor: &Cursor) -> Result<bool, StoreError> {
        Ok(self.cursor()? == *cursor)
    }

    fn field(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.current()?.field(name).map(str::to_string))
    }

    fn realtime_usec(&self) -> Result<u64, StoreError> {
        Ok(self.current()?.realtime_usec)
    }

    fn monotonic_usec(&self) -> Result<u64, StoreError> {
        Ok(self.current()?.monotonic_usec)
    }

    fn unique_values(&mut self, field: &str) -> Result<Vec<String>, StoreError> {
        if field.is_empty() {
            return Err(StoreError::new("query_unique", EINVAL));
        }
        let values: BTreeSet<String> = self
            .store
            .read()
            .records
            .iter()
            .filter_map(|r| r.field(field).map(str::to_string))
            .collect();
        Ok(values.into_iter().collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
