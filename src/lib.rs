#![forbid(unsafe_code)]
//! extree: execution-tree bookkeeping for a symbolic-execution engine.
//!
//! Re-exports the workspace crates under one name:
//! - [`core`]: ids, configuration, branch/termination kinds, `PathState`
//! - [`log`]: the append-only tree log and offline replay
//! - [`tree`]: the live tree, its variants, and random-path selection
//! - [`export`]: monotonic snapshots and the constraint infix printer

pub use extree_core as core;
pub use extree_export as export;
pub use extree_log as log;
pub use extree_tree as tree;

pub use extree_core::{BasicState, BranchType, NodeKey, PathState, StateRef, TerminationKind, TreeConfig};
pub use extree_export::{Exporter, Snapshot};
pub use extree_tree::{ExecutionTree, InMemoryTree, RandomPath, SearchTree};
