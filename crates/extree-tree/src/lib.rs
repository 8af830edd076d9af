#![forbid(unsafe_code)]
//! extree-tree: the live execution tree.
//!
//! The engine calls [`SearchTree::attach`] each time a path forks and
//! [`SearchTree::remove`] each time one terminates. Nodes live in a
//! generational arena and every edge carries a small tag mask so that
//! several [`RandomPath`] selectors can bookmark the tree at once.
//!
//! [`ExecutionTree`] picks one of the three variants from [`TreeConfig`]:
//! a no-op stub, the in-memory tree, or the persistent tree that also
//! writes every branch and termination to the tree log.
//!
//! [`TreeConfig`]: extree_core::TreeConfig

pub mod arena;
pub mod ids;
pub mod node;
pub mod random_path;
pub mod tagged;
pub mod tree;

pub use arena::NodeArena;
pub use ids::IdAllocator;
pub use node::{Annotation, TreeNode};
pub use random_path::RandomPath;
pub use tagged::{TagMask, TaggedRef, TAG_WIDTH};
pub use tree::{ExecutionTree, InMemoryTree, NoopTree, PersistentTree, SearchTree, TreeSink};
