//! Strongly-typed identifiers used across the tree, log, and exporter.
//!
//! Two notions of node identity exist and must not be mixed:
//! - [`NodeKey`] is the allocation identity of a live node (arena slot plus
//!   generation). The exporter keys its snapshot on it.
//! - [`NodeId`] is the persisted, monotonically assigned id written to the log.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! new_id {
    ($name:ident, $repr:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            pub const fn new(v: $repr) -> Self {
                Self(v)
            }
            pub const fn get(self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(NodeId, u64);
new_id!(StateId, u32);

/// Allocation identity of a node: arena slot and the generation that slot
/// had when the node was created. A reused slot gets a new generation, so a
/// key never aliases a later node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct NodeKey {
    slot: u32,
    generation: u32,
}

impl NodeKey {
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub const fn slot(self) -> u32 {
        self.slot
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}g{}", self.slot, self.generation)
    }
}

/// One persisted run. Stamped into every log batch so a reader can reject
/// interleaved runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new_v4() -> Self {
        RunId(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_key_display_includes_generation() {
        assert_eq!(NodeKey::new(3, 0).to_string(), "n3g0");
        assert_ne!(NodeKey::new(3, 0).to_string(), NodeKey::new(3, 1).to_string());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&NodeId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: StateId = serde_json::from_str("7").unwrap();
        assert_eq!(back.get(), 7);
    }
}
