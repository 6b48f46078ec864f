//! View engine state.
//!
//! Layered bottom-up: the window buffer holds entries, the fetch engine fills
//! it from a journal, the view adds the fetch and reset guards, and search
//! scans the view.

pub mod fetch;
pub mod search;
pub mod view;
pub mod window;

pub use fetch::{FetchEngine, FetchResult, SeekError};
pub use search::SearchQuery;
pub use view::{JournalView, ViewObserver};
pub use window::{WindowBuffer, DEFAULT_CHUNK_SIZE};
