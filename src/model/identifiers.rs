//! Core identifier newtypes with smart constructors.
//!
//! All identifiers validate non-empty strings at construction time.
//! Raw constructors are never exported - use smart constructors only.

use std::fmt;

/// Opaque token identifying one entry's position in the journal.
///
/// The engine never interprets the contents; cursors are only compared
/// through the store's own test primitive or by equality for de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    /// Smart constructor: validates non-empty cursor
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidCursor> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidCursor::Empty);
        }
        Ok(Self(raw))
    }

    /// Raw cursor text as issued by the store.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one boot, as stored in the `_BOOT_ID` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BootId(String);

impl BootId {
    /// Smart constructor: validates non-empty boot ID
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidBootId> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(InvalidBootId::Empty);
        }
        Ok(Self(raw))
    }

    /// Raw boot id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ===== Error Types =====

/// Error returned by [`Cursor::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCursor {
    /// The cursor string was empty.
    #[error("Cursor cannot be empty")]
    Empty,
}

/// Error returned by [`BootId::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidBootId {
    /// The boot id was empty or whitespace.
    #[error("Boot ID cannot be empty")]
    Empty,
}

// ===== Tests =====
