//! Tree node model.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use extree_core::{BranchType, NodeId, NodeKey, StateId, StateRef, TerminationKind};

use crate::tagged::TaggedRef;

/// Metadata carried by nodes of the persistent tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Annotation {
    /// Persisted id, unique for the lifetime of the tree.
    pub id: NodeId,
    pub branch_reason: BranchType,
    pub termination_kind: TerminationKind,
    /// Assembly line of the state's previous instruction at branch or
    /// termination time, 0 when unknown.
    pub source_line: u64,
    /// Id of the state that terminated here.
    pub state_id: Option<StateId>,
}

impl Annotation {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            branch_reason: BranchType::None,
            termination_kind: TerminationKind::Running,
            source_line: 0,
            state_id: None,
        }
    }
}

/// A node is either a frontier leaf (no children, may bookmark a state) or
/// internal with exactly two children.
#[derive(Debug)]
pub struct TreeNode<S> {
    pub(crate) parent: Option<NodeKey>,
    pub(crate) left: TaggedRef,
    pub(crate) right: TaggedRef,
    pub(crate) state: Option<Weak<RefCell<S>>>,
    pub(crate) annotation: Option<Annotation>,
}

impl<S> TreeNode<S> {
    pub(crate) fn new(parent: Option<NodeKey>, state: &StateRef<S>) -> Self {
        Self {
            parent,
            left: TaggedRef::null(),
            right: TaggedRef::null(),
            state: Some(Rc::downgrade(state)),
            annotation: None,
        }
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn left(&self) -> TaggedRef {
        self.left
    }

    pub fn right(&self) -> TaggedRef {
        self.right
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_null() && self.right.is_null()
    }

    /// The bookmarked state, if this is a frontier leaf and the engine
    /// still holds the state.
    pub fn state(&self) -> Option<StateRef<S>> {
        self.state.as_ref().and_then(Weak::upgrade)
    }

    pub fn has_state(&self) -> bool {
        self.state().is_some()
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    /// Non-null children, left first.
    pub fn children(&self) -> impl Iterator<Item = NodeKey> {
        self.left.pointer().into_iter().chain(self.right.pointer())
    }

    /// The edge from this node to `child`.
    pub(crate) fn edge_to_mut(&mut self, child: NodeKey) -> Option<&mut TaggedRef> {
        if self.left.points_to(child) {
            Some(&mut self.left)
        } else if self.right.points_to(child) {
            Some(&mut self.right)
        } else {
            None
        }
    }

    pub(crate) fn edge_to(&self, child: NodeKey) -> Option<TaggedRef> {
        if self.left.points_to(child) {
            Some(self.left)
        } else if self.right.points_to(child) {
            Some(self.right)
        } else {
            None
        }
    }
}
