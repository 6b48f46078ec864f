//! Journal view: the interface consumed by list views and search.
//!
//! `JournalView` owns the fetch engine and adds the two guards that make it
//! safe to drive from a single-threaded event loop whose callbacks may reenter
//! the view:
//!
//! - a single-flight fetch guard: a fetch requested while another is running
//!   is rejected with a warning instead of interleaving store reads
//! - a reset guard: while the window is being rebuilt (filter change, reseek)
//!   external fetch requests are ignored and observers see exactly one
//!   `reset_begin`/`reset_end` pair instead of per-step insertions
//!
//! Methods take `&self`; state lives in `Cell`/`RefCell` so an observer
//! callback holding a reference to the view can call back into it.

use crate::filter::{ApplyReport, FilterTree};
use crate::model::{FilterSpec, LogEntry};
use crate::source::{Direction, JournalProvider, UpdateListener};
use crate::state::fetch::{FetchEngine, FetchResult};
use crate::state::search::{self, SearchQuery};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, error, info, warn};

/// Structural change notifications.
///
/// Row indices refer to the buffer after the change has been applied.
pub trait ViewObserver {
    /// `count` rows were inserted starting at row `first`.
    fn rows_inserted(&self, _first: usize, _count: usize) {}
    /// The window is about to be rebuilt; buffered rows are invalid.
    fn reset_begin(&self) {}
    /// The rebuild finished; re-read every row.
    fn reset_end(&self) {}
}

/// Filtered, windowed view over one journal handle.
pub struct JournalView {
    engine: RefCell<FetchEngine>,
    filter: RefCell<FilterSpec>,
    updates: Option<UpdateListener>,
    observer: RefCell<Option<Rc<dyn ViewObserver>>>,
    /// Single-flight counter, 0 or 1.
    fetching: Cell<u8>,
    reset_active: Cell<bool>,
    /// Bumped by every outermost reset; lets a fetch notice a rebuild made by
    /// an observer between its notifications.
    reset_generation: Cell<u64>,
}

impl std::fmt::Debug for JournalView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalView")
            .field("engine", &self.engine)
            .field("filter", &self.filter)
            .field("fetching", &self.fetching.get())
            .field("reset_active", &self.reset_active.get())
            .field("reset_generation", &self.reset_generation.get())
            .finish_non_exhaustive()
    }
}

impl JournalView {
    /// Open a view on `provider`.
    ///
    /// A provider that fails to open yields an unavailable view: every read is a
    /// no-op. The failure is logged here, once.
    pub fn open(provider: &dyn JournalProvider, chunk_size: usize) -> Self {
        let engine = match provider.open() {
            Ok(journal) => FetchEngine::new(journal, chunk_size),
            Err(err) => {
                error!(error = %err, "Journal unavailable; view will stay empty");
                FetchEngine::unavailable(chunk_size)
            }
        };
        let updates = if engine.is_available() {
            provider.subscribe()
        } else {
            None
        };
        Self::from_engine(engine, updates)
    }

    /// Wrap an engine directly.
    pub fn from_engine(engine: FetchEngine, updates: Option<UpdateListener>) -> Self {
        Self {
            engine: RefCell::new(engine),
            filter: RefCell::new(FilterSpec::default()),
            updates,
            observer: RefCell::new(None),
            fetching: Cell::new(0),
            reset_active: Cell::new(false),
            reset_generation: Cell::new(0),
        }
    }

    /// Install the observer receiving change notifications.
    pub fn set_observer(&self, observer: Rc<dyn ViewObserver>) {
        *self.observer.borrow_mut() = Some(observer);
    }

    /// Remove the observer.
    pub fn clear_observer(&self) {
        self.observer.borrow_mut().take();
    }

    /// Whether the journal could be opened.
    pub fn is_available(&self) -> bool {
        self.engine.borrow().is_available()
    }

    /// Buffered rows.
    pub fn row_count(&self) -> usize {
        self.engine.borrow().window().len()
    }

    /// Snapshot of the entry at `row`.
    pub fn row_at(&self, row: usize) -> Option<LogEntry> {
        self.engine.borrow().window().get(row).cloned()
    }

    /// Run `f` on the entry at `row` without cloning it.
    pub fn with_row<R>(&self, row: usize, f: impl FnOnce(&LogEntry) -> R) -> Option<R> {
        self.engine.borrow().window().get(row).map(f)
    }

    /// Snapshot of every buffered entry, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.engine.borrow().window().iter().cloned().collect()
    }

    /// The oldest matching entry is buffered.
    pub fn head_reached(&self) -> bool {
        self.engine.borrow().window().head_reached()
    }

    /// The newest matching entry is buffered.
    pub fn tail_reached(&self) -> bool {
        self.engine.borrow().window().tail_reached()
    }

    /// Entries read per directional fetch.
    pub fn chunk_size(&self) -> usize {
        self.engine.borrow().window().chunk_size()
    }

    /// Change the number of entries read per directional fetch. Zero is rejected.
    pub fn set_chunk_size(&self, chunk_size: usize) -> bool {
        let accepted = self.engine.borrow_mut().window_mut().set_chunk_size(chunk_size);
        if !accepted {
            warn!(chunk_size, "Rejected chunk size");
        }
        accepted
    }

    /// A window rebuild is in progress.
    pub fn is_reset_active(&self) -> bool {
        self.reset_active.get()
    }

    /// A fetch is in progress.
    pub fn is_fetching(&self) -> bool {
        self.fetching.get() > 0
    }

    /// The filter currently applied.
    pub fn filter(&self) -> FilterSpec {
        self.filter.borrow().clone()
    }

    /// Whether [`fetch_more`](Self::fetch_more) could add anything.
    pub fn can_fetch_more(&self) -> bool {
        if self.reset_active.get() {
            return false;
        }
        let engine = self.engine.borrow();
        engine.is_available() && !engine.window().is_complete()
    }

    /// Grow the window at both edges.
    ///
    /// Ignored while a reset is in progress. A call made while another fetch is
    /// running (from an observer callback) logs a warning and returns an empty
    /// result.
    pub fn fetch_more(&self) -> FetchResult {
        if self.reset_active.get() {
            debug!("Fetch request ignored during reset");
            return FetchResult::default();
        }
        self.fetch_guarded()
    }

    /// Replace the filter and rebuild the window from the head.
    ///
    /// Observers see one reset and no insertions.
    pub fn set_filter(&self, spec: FilterSpec) -> ApplyReport {
        let _reset = ResetGuard::begin(self);
        if *self.filter.borrow() != spec {
            debug!(?spec, "Filter changed");
        }
        let report = self.engine.borrow_mut().apply_filter(&spec);
        *self.filter.borrow_mut() = spec;
        info!(
            groups = report.groups,
            applied = report.applied,
            skipped = report.skipped,
            "Filter applied"
        );
        self.reseek(Direction::TowardsTail);
        report
    }

    /// Clear the window and read one chunk from the head. Returns the row count.
    pub fn seek_head(&self) -> usize {
        let _reset = ResetGuard::begin(self);
        self.reseek(Direction::TowardsTail)
    }

    /// Clear the window and read one chunk from the tail. Returns the row count.
    pub fn seek_tail(&self) -> usize {
        let _reset = ResetGuard::begin(self);
        self.reseek(Direction::TowardsHead)
    }

    /// Consume pending "store updated" notifications.
    ///
    /// When a notification arrived and the tail had been reached, the tail flag
    /// is cleared and one tail-ward chunk is read. Returns the rows added.
    pub fn process_updates(&self) -> usize {
        let Some(updates) = &self.updates else {
            return 0;
        };
        if self.reset_active.get() || self.is_fetching() {
            // Leave notifications queued for the next tick.
            return 0;
        }
        if !updates.drain() {
            return 0;
        }
        if !self.tail_reached() {
            debug!("Store updated; tail not reached, nothing to do");
            return 0;
        }

        let _flight = FetchGuard::acquire(self);
        let (added, len) = {
            let mut engine = self.engine.borrow_mut();
            engine.window_mut().set_reached(Direction::TowardsTail, false);
            let added = engine.extend(Direction::TowardsTail);
            (added, engine.window().len())
        };
        debug!(added, "Store updated; tail extended");
        let generation = self.reset_generation.get();
        self.notify_inserted(len - added, added);
        if self.reset_generation.get() != generation {
            return 0;
        }
        added
    }

    /// Find the next row whose message contains `needle`, extending the window
    /// when the scan runs off an edge.
    pub fn search(
        &self,
        needle: &str,
        start_row: usize,
        case_sensitive: bool,
        direction: Direction,
    ) -> Option<usize> {
        let query = SearchQuery::new(needle, case_sensitive)?;
        search::search(self, &query, start_row, direction)
    }

    /// Build a selection tree from the store's unique values, with the
    /// current filter's selections checked.
    pub fn filter_tree(&self) -> FilterTree {
        let mut tree = FilterTree::new();
        let mut engine = self.engine.borrow_mut();
        if let Some(journal) = engine.journal_mut() {
            if let Err(err) = tree.populate(journal) {
                warn!(error = %err, "Failed to list filter values");
            }
        }
        drop(engine);
        tree.select(&self.filter.borrow());
        tree
    }

    /// Clear and read one chunk in `direction`, without notifying inserts.
    fn reseek(&self, direction: Direction) -> usize {
        let _flight = FetchGuard::acquire(self);
        let mut engine = self.engine.borrow_mut();
        match direction {
            Direction::TowardsTail => engine.seek_head(),
            Direction::TowardsHead => engine.seek_tail(),
        };
        engine.window().len()
    }

    fn fetch_guarded(&self) -> FetchResult {
        if self.is_fetching() {
            warn!("Fetch already in progress; request ignored");
            return FetchResult::default();
        }
        let _flight = FetchGuard::acquire(self);

        let (result, len) = {
            let mut engine = self.engine.borrow_mut();
            if !engine.is_available() || engine.window().is_complete() {
                return FetchResult::default();
            }
            let result = engine.fetch_both();
            (result, engine.window().len())
        };
        debug!(head = result.head, tail = result.tail, rows = len, "Fetched more entries");

        // Both edges are applied before either notification goes out. An
        // observer that rebuilds the window invalidates the remaining ranges
        // and the counts returned to the caller.
        let generation = self.reset_generation.get();
        self.notify_inserted(0, result.head);
        if self.reset_generation.get() != generation {
            debug!("Window rebuilt by observer; dropping tail notification");
            return FetchResult::default();
        }
        self.notify_inserted(len - result.tail, result.tail);
        if self.reset_generation.get() != generation {
            return FetchResult::default();
        }
        result
    }

    fn observer(&self) -> Option<Rc<dyn ViewObserver>> {
        self.observer.borrow().clone()
    }

    fn notify_inserted(&self, first: usize, count: usize) {
        if count == 0 || self.reset_active.get() {
            return;
        }
        if let Some(observer) = self.observer() {
            observer.rows_inserted(first, count);
        }
    }
}

/// Holds the single-flight counter for the duration of a fetch.
struct FetchGuard<'a> {
    view: &'a JournalView,
    previous: u8,
}

impl<'a> FetchGuard<'a> {
    fn acquire(view: &'a JournalView) -> Self {
        let previous = view.fetching.replace(1);
        Self { view, previous }
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.view.fetching.set(self.previous);
    }
}

/// Brackets a window rebuild. Only the outermost guard notifies observers.
struct ResetGuard<'a> {
    view: &'a JournalView,
    outermost: bool,
}

impl<'a> ResetGuard<'a> {
    fn begin(view: &'a JournalView) -> Self {
        let outermost = !view.reset_active.replace(true);
        if outermost {
            view.reset_generation.set(view.reset_generation.get().wrapping_add(1));
            if let Some(observer) = view.observer() {
                observer.reset_begin();
            }
        }
        Self { view, outermost }
    }
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        if !self.outermost {
            return;
        }
        self.view.reset_active.set(false);
        if let Some(observer) = self.view.observer() {
            observer.reset_end();
        }
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
