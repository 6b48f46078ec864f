//! Domain model types (pure).
//!
//! All types in this module are pure data with smart constructors.

pub mod error;
pub mod filter;
pub mod identifiers;
pub mod log_entry;

// Re-export for convenience
pub use filter::FilterSpec;
pub use identifiers::{BootId, Cursor, InvalidBootId, InvalidCursor};
pub use log_entry::{unit_template_group, InvalidPriority, LogEntry, Priority};
