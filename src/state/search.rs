//! Substring search over the view.
//!
//! The scan runs over buffered rows and asks the view for more entries when it
//! runs off an edge. Fetches grow both edges at once, so row indices shift by
//! the number of entries prepended at the head; the scan position is adjusted
//! accordingly.

use crate::model::LogEntry;
use crate::source::Direction;
use crate::state::view::JournalView;
use tracing::debug;

// ===== SearchQuery =====

/// Validated search needle. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    needle: String,
    case_sensitive: bool,
}

impl SearchQuery {
    /// Returns `None` for an empty needle.
    pub fn new(needle: impl Into<String>, case_sensitive: bool) -> Option<Self> {
        let needle = needle.into();
        if needle.is_empty() {
            return None;
        }
        let needle = if case_sensitive {
            needle
        } else {
            needle.to_lowercase()
        };
        Some(Self {
            needle,
            case_sensitive,
        })
    }

    /// Needle as matched; lowercased for case-insensitive queries.
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Whether case is significant.
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether `entry`'s message contains the needle.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if self.case_sensitive {
            entry.message().contains(&self.needle)
        } else {
            entry.message().to_lowercase().contains(&self.needle)
        }
    }
}

// ===== Search Execution =====

/// Find the first row at or after (tail-ward) / at or before (head-ward)
/// `start_row` whose message matches `query`.
///
/// A head-ward scan starting past the last row starts at the last row.
pub fn search(
    view: &JournalView,
    query: &SearchQuery,
    start_row: usize,
    direction: Direction,
) -> Option<usize> {
    let mut row = start_row;
    loop {
        let rows = view.row_count();
        match direction {
            Direction::TowardsTail => {
                if let Some(found) = (row..rows).find(|r| row_matches(view, query, *r)) {
                    return Some(found);
                }
                row = row.max(rows);
            }
            Direction::TowardsHead => {
                if rows > 0 {
                    let from = row.min(rows - 1);
                    if let Some(found) = (0..=from).rev().find(|r| row_matches(view, query, *r)) {
                        return Some(found);
                    }
                }
            }
        }

        if !view.can_fetch_more() {
            return None;
        }
        let fetched = view.fetch_more();
        debug!(head = fetched.head, tail = fetched.tail, "Search extended window");
        match direction {
            Direction::TowardsTail => {
                if fetched.tail == 0 {
                    return None;
                }
                row = row.saturating_add(fetched.head);
            }
            Direction::TowardsHead if rows == 0 => {
                if fetched.is_empty() {
                    return None;
                }
                row = usize::MAX;
            }
            Direction::TowardsHead => {
                if fetched.head == 0 {
                    return None;
                }
                // Only the newly prepended rows remain unscanned.
                row = fetched.head - 1;
            }
        }
    }
}

fn row_matches(view: &JournalView, query: &SearchQuery, row: usize) -> bool {
    view.with_row(row, |entry| query.matches(entry)).unwrap_or(false)
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
