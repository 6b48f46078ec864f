//! Filter compilation and selection.
//!
//! - [`compiler`]: turns a `FilterSpec` into store match clauses
//! - [`tree`]: arena-backed selection tree producing a `FilterSpec`

pub mod compiler;
pub mod tree;

pub use compiler::{compile, ApplyReport, ClauseGroup, FilterPlan, GroupKind, Term};
pub use tree::{Category, CheckState, FilterTree, NodeId, NodeKind};
