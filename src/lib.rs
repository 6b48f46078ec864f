//! Journal log view (jlv)
//!
//! Filtered, windowed view over an append-only journal store that only offers
//! a constrained match grammar and opaque cursors.
//!
//! - [`filter`] compiles a [`model::FilterSpec`] into the store's match calls
//! - [`state`] pages entries into an in-memory window in both directions and
//!   guards against overlapping fetches
//! - [`source`] defines the store primitives and provides an in-memory store
//!   plus a `journalctl -o json` export loader

pub mod config;
pub mod filter;
pub mod logging;
pub mod model;
pub mod source;
pub mod state;
