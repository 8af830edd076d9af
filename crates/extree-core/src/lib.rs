#![forbid(unsafe_code)]
//! extree-core: shared vocabulary for the execution-tree subsystem.
//!
//! Ids, configuration, branch/termination kinds, and the `PathState`
//! interface the engine's path-states implement. No I/O lives here; the
//! log, tree, and export crates build on these types.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod kind;
pub mod prelude;
pub mod state;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use config::TreeConfig;
pub use error::{Error, Result};
pub use id::{NodeId, NodeKey, RunId, StateId};
pub use kind::{BranchType, TerminationKind};
pub use state::{BasicMemoryObject, BasicState, MemoryObject, PathState, StateRef};
