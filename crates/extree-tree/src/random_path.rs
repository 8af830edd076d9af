//! Random-path selection over tagged edges.
//!
//! Each selector owns one tag bit. An edge carries the bit when some state
//! the selector tracks lives below it, so selection is a walk from the root
//! that only follows marked edges.

use extree_core::{NodeKey, PathState, Result, StateRef};

use crate::tagged::TagMask;
use crate::tree::{InMemoryTree, SearchTree};

#[derive(Debug, Clone, Copy)]
pub struct RandomPath {
    mask: TagMask,
}

impl RandomPath {
    /// Register a selector with `tree`, claiming the next tag bit.
    pub fn new<S: PathState>(tree: &mut InMemoryTree<S>) -> Result<Self> {
        Ok(Self {
            mask: SearchTree::next_id(tree)?,
        })
    }

    pub fn mask(&self) -> TagMask {
        self.mask
    }

    /// Track the states now at the `added` leaves and stop tracking the
    /// ones at the `removed` leaves. Removed leaves must still be in the
    /// tree.
    pub fn update<S: PathState>(
        &self,
        tree: &mut InMemoryTree<S>,
        added: &[NodeKey],
        removed: &[NodeKey],
    ) {
        for &leaf in added {
            self.mark(tree, leaf);
        }
        for &leaf in removed {
            self.unmark(tree, leaf);
        }
    }

    /// Mark edges upward from `leaf` until one is already marked.
    fn mark<S: PathState>(&self, tree: &mut InMemoryTree<S>, leaf: NodeKey) {
        let mut current = Some(leaf);
        while let Some(key) = current {
            let parent = tree.node(key).and_then(|n| n.parent());
            let Some(edge) = tree.incoming_edge_mut(key) else {
                break;
            };
            if edge.is_marked(self.mask) {
                break;
            }
            edge.set_tag(edge.tag() | self.mask);
            current = parent;
        }
    }

    /// Clear edges upward from `leaf` while no other marked child remains
    /// below.
    fn unmark<S: PathState>(&self, tree: &mut InMemoryTree<S>, leaf: NodeKey) {
        let mut current = Some(leaf);
        while let Some(key) = current {
            let Some(n) = tree.node(key) else {
                break;
            };
            if n.left().is_marked(self.mask) || n.right().is_marked(self.mask) {
                break;
            }
            let parent = n.parent();
            if let Some(edge) = tree.incoming_edge_mut(key) {
                edge.set_tag(edge.tag() & !self.mask);
            }
            current = parent;
        }
    }

    /// Walk from the root through marked edges to a state-bearing leaf.
    /// Where both children are marked, `coin()` returning true goes left.
    ///
    /// Returns `None` when this selector tracks no state.
    pub fn select<S: PathState>(
        &self,
        tree: &InMemoryTree<S>,
        mut coin: impl FnMut() -> bool,
    ) -> Option<StateRef<S>> {
        if !tree.root().is_marked(self.mask) {
            return None;
        }
        let mut key = tree.root_key()?;
        loop {
            let n = tree.node(key)?;
            if let Some(state) = n.state() {
                return Some(state);
            }
            let (left, right) = (n.left(), n.right());
            key = match (left.is_marked(self.mask), right.is_marked(self.mask)) {
                (true, true) => {
                    if coin() {
                        left.pointer()?
                    } else {
                        right.pointer()?
                    }
                }
                (true, false) => left.pointer()?,
                (false, true) => right.pointer()?,
                (false, false) => return None,
            };
        }
    }
}
