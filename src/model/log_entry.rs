//! Journal entry types.
//!
//! LogEntry is one record read from the journal. Entries are immutable once
//! read; the window buffer owns them after they are appended.

use crate::model::{BootId, Cursor};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

// ===== Priority =====

/// Syslog priority of an entry. Lower levels are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// System is unusable (0).
    Emergency = 0,
    /// Action must be taken immediately (1).
    Alert = 1,
    /// Critical condition (2).
    Critical = 2,
    /// Error condition (3).
    Error = 3,
    /// Warning condition (4).
    Warning = 4,
    /// Normal but significant (5).
    Notice = 5,
    /// Informational (6).
    Info = 6,
    /// Debug-level message (7).
    Debug = 7,
}

impl Priority {
    /// All priorities, most severe first.
    pub const ALL: [Priority; 8] = [
        Priority::Emergency,
        Priority::Alert,
        Priority::Critical,
        Priority::Error,
        Priority::Warning,
        Priority::Notice,
        Priority::Info,
        Priority::Debug,
    ];

    /// Convert a numeric level (0-7). Returns None for anything else.
    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(usize::from(level)).copied()
    }

    /// Parse the textual `PRIORITY` field value.
    pub fn parse_field(value: &str) -> Option<Self> {
        value.trim().parse::<u8>().ok().and_then(Self::from_level)
    }

    /// Numeric syslog level.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Short syslog keyword, as printed by journalctl.
    pub fn name(self) -> &'static str {
        match self {
            Priority::Emergency => "emerg",
            Priority::Alert => "alert",
            Priority::Critical => "crit",
            Priority::Error => "err",
            Priority::Warning => "warning",
            Priority::Notice => "notice",
            Priority::Info => "info",
            Priority::Debug => "debug",
        }
    }

    /// Priorities at least as severe as `self`, i.e. levels `0..=self`.
    pub fn at_or_above(self) -> impl Iterator<Item = Priority> {
        Self::ALL.into_iter().take(usize::from(self.level()) + 1)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text that is neither a level 0-7 nor a syslog keyword.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority {0:?}; expected 0-7 or a name such as \"err\"")]
pub struct InvalidPriority(pub String);

impl std::str::FromStr for Priority {
    type Err = InvalidPriority;

    /// Accepts a numeric level or a keyword (`emerg` ... `debug`), case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(priority) = Self::parse_field(s) {
            return Ok(priority);
        }
        let keyword = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == keyword)
            .ok_or_else(|| InvalidPriority(s.to_string()))
    }
}

// ===== LogEntry =====

/// One journal record.
///
/// Only the cursor and the two timestamps are mandatory; every other field
/// may be missing from a record and is modelled as `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    cursor: Cursor,
    realtime: DateTime<Utc>,
    monotonic: Duration,
    message: String,
    message_id: Option<String>,
    unit: Option<String>,
    unit_prefix: Option<String>,
    boot_id: Option<BootId>,
    exe: Option<String>,
    transport: Option<String>,
    priority: Option<Priority>,
}

impl LogEntry {
    /// Create an entry with the mandatory fields; optional fields start empty.
    pub fn new(cursor: Cursor, realtime: DateTime<Utc>, monotonic: Duration) -> Self {
        Self {
            cursor,
            realtime,
            monotonic,
            message: String::new(),
            message_id: None,
            unit: None,
            unit_prefix: None,
            boot_id: None,
            exe: None,
            transport: None,
            priority: None,
        }
    }

    /// Set the `MESSAGE` text.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the `MESSAGE_ID` catalog id.
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Set the originating unit. The template group is derived from it.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        let unit = unit.into();
        self.unit_prefix = Some(unit_template_group(&unit).to_string());
        self.unit = Some(unit);
        self
    }

    /// Set the boot the entry was logged in.
    pub fn with_boot_id(mut self, boot_id: BootId) -> Self {
        self.boot_id = Some(boot_id);
        self
    }

    /// Set the executable path.
    pub fn with_exe(mut self, exe: impl Into<String>) -> Self {
        self.exe = Some(exe.into());
        self
    }

    /// Set the `_TRANSPORT` value (`kernel`, `journal`, ...).
    pub fn with_transport(mut self, transport: impl Into<String>) -> Self {
        self.transport = Some(transport.into());
        self
    }

    /// Set the syslog priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    // ===== Accessors (read-only) =====

    /// Store cursor; unique within one store.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Wall-clock time the entry was logged.
    pub fn realtime(&self) -> DateTime<Utc> {
        self.realtime
    }

    /// Time since boot when the entry was logged.
    pub fn monotonic(&self) -> Duration {
        self.monotonic
    }

    /// Message text; empty when the record had none.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Catalog message id.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Originating system or user unit.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Unit name with instance arguments and type suffix stripped.
    pub fn unit_prefix(&self) -> Option<&str> {
        self.unit_prefix.as_deref()
    }

    /// Boot the entry was logged in.
    pub fn boot_id(&self) -> Option<&BootId> {
        self.boot_id.as_ref()
    }

    /// Executable path (`_EXE`).
    pub fn exe(&self) -> Option<&str> {
        self.exe.as_deref()
    }

    /// How the entry reached the journal (`_TRANSPORT`).
    pub fn transport(&self) -> Option<&str> {
        self.transport.as_deref()
    }

    /// Syslog priority, when the record carried a valid one.
    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    /// Render as a single journalctl-like line.
    pub fn display_line(&self) -> String {
        let source = self
            .unit
            .as_deref()
            .or(self.exe.as_deref())
            .or(self.transport.as_deref())
            .unwrap_or("-");
        let priority = self.priority.map(Priority::name).unwrap_or("-");
        format!(
            "{} {}[{}]: {}",
            self.realtime.format("%Y-%m-%d %H:%M:%S%.3f"),
            source,
            priority,
            self.message
        )
    }
}

/// Strip instance arguments (`@...`) and the unit type suffix.
///
/// `getty@tty1.service` and `getty@tty2.service` both map to `getty`.
pub fn unit_template_group(unit: &str) -> &str {
    let base = match unit.split_once('@') {
        Some((prefix, _)) => prefix,
        None => unit,
    };
    match base.rsplit_once('.') {
        Some((prefix, _)) if !prefix.is_empty() => prefix,
        _ => base,
    }
}

// ===== Tests =====
