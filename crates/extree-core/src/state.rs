//! The path-state interface the tree consumes.
//!
//! Path-states belong to the engine. The tree only bookmarks them from
//! frontier leaves and reads them when annotating nodes or exporting, so the
//! interface is read-only apart from the node back-reference.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::id::{NodeKey, StateId};

/// Shared handle to an engine-owned path-state.
pub type StateRef<S> = Rc<RefCell<S>>;

/// One symbolic memory object as seen by the exporter.
pub trait MemoryObject {
    fn name(&self) -> &str;
    /// Size in bytes.
    fn size(&self) -> u32;
    /// Rendered base-address expression.
    fn base_address(&self) -> String;
    /// Rendered expression for the byte at `offset` (`offset < size()`).
    fn read_byte(&self, offset: u32) -> String;
}

/// Read-only view of an in-progress exploration path, plus the back-reference
/// to the frontier leaf that currently bookmarks it.
pub trait PathState {
    fn id(&self) -> StateId;

    /// Frontier leaf currently bookmarking this state, if any.
    fn tree_node(&self) -> Option<NodeKey>;
    fn set_tree_node(&mut self, node: Option<NodeKey>);

    /// Source location of the next instruction.
    fn pc_location(&self) -> String;
    /// Source location of the last executed instruction.
    fn prev_pc_location(&self) -> String;
    /// Assembly line of the last executed instruction, when debug info exists.
    fn prev_pc_line(&self) -> Option<u64>;

    fn insts_since_cov_new(&self) -> u64;
    fn stepped_instructions(&self) -> u64;

    /// Path constraints, each already rendered by the expression printer.
    fn constraints(&self) -> Vec<String>;
    /// Covered lines keyed by source file.
    fn covered_lines(&self) -> &BTreeMap<String, BTreeSet<u32>>;
    fn memory_objects(&self) -> Vec<&dyn MemoryObject>;
}

/// Plain-data memory object whose bytes are rendered up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicMemoryObject {
    pub name: String,
    pub base_address: String,
    pub bytes: Vec<String>,
}

impl MemoryObject for BasicMemoryObject {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    fn base_address(&self) -> String {
        self.base_address.clone()
    }

    fn read_byte(&self, offset: u32) -> String {
        self.bytes.get(offset as usize).cloned().unwrap_or_default()
    }
}

/// Plain-data `PathState` for drivers that keep their own interpreter state
/// elsewhere and only hand the tree pre-rendered values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicState {
    pub id: u32,
    #[serde(skip)]
    pub node: Option<NodeKey>,
    pub pc: String,
    pub prev_pc: String,
    pub prev_pc_line: Option<u64>,
    pub insts_since_cov_new: u64,
    pub stepped_instructions: u64,
    pub constraints: Vec<String>,
    pub covered_lines: BTreeMap<String, BTreeSet<u32>>,
    pub memory: Vec<BasicMemoryObject>,
}

impl BasicState {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Wrap into the shared handle the tree expects.
    pub fn into_ref(self) -> StateRef<Self> {
        Rc::new(RefCell::new(self))
    }

    /// Copy the path-specific parts of `self` into a fresh state with `id`,
    /// the way an engine clones a state on fork.
    pub fn fork(&self, id: u32) -> Self {
        Self {
            id,
            node: None,
            ..self.clone()
        }
    }
}

impl PathState for BasicState {
    fn id(&self) -> StateId {
        StateId::new(self.id)
    }

    fn tree_node(&self) -> Option<NodeKey> {
        self.node
    }

    fn set_tree_node(&mut self, node: Option<NodeKey>) {
        self.node = node;
    }

    fn pc_location(&self) -> String {
        self.pc.clone()
    }

    fn prev_pc_location(&self) -> String {
        self.prev_pc.clone()
    }

    fn prev_pc_line(&self) -> Option<u64> {
        self.prev_pc_line
    }

    fn insts_since_cov_new(&self) -> u64 {
        self.insts_since_cov_new
    }

    fn stepped_instructions(&self) -> u64 {
        self.stepped_instructions
    }

    fn constraints(&self) -> Vec<String> {
        self.constraints.clone()
    }

    fn covered_lines(&self) -> &BTreeMap<String, BTreeSet<u32>> {
        &self.covered_lines
    }

    fn memory_objects(&self) -> Vec<&dyn MemoryObject> {
        self.memory.iter().map(|m| m as &dyn MemoryObject).collect()
    }
}
