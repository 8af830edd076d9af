#![forbid(unsafe_code)]
//! extree-export: durable views of the live tree.
//!
//! The [`Exporter`] turns each dump of the live tree into a [`Snapshot`]
//! that only ever grows: nodes pruned from the tree stay in the snapshot,
//! and children seen at any export stay listed. Path constraints are
//! printed in infix form by [`to_infix`].

pub mod error;
pub mod exporter;
pub mod infix;
pub mod snapshot;
pub mod stream;

pub use error::{Error, Result};
pub use exporter::Exporter;
pub use infix::{normalize_whitespace, to_infix};
pub use snapshot::{MemoryObjectDump, Snapshot, SnapshotRecord, StateAttributes};
pub use stream::SnapshotStream;
