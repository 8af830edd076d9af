//! Convenient re-exports for downstream crates.

pub use crate::config::TreeConfig;
pub use crate::error::{Error, Result};
pub use crate::hash::{hash_serde, Hash256};
pub use crate::id::{NodeId, NodeKey, RunId, StateId};
pub use crate::kind::{BranchType, TerminationKind};
pub use crate::state::{BasicMemoryObject, BasicState, MemoryObject, PathState, StateRef};
