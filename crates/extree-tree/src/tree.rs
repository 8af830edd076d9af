//! The execution tree and its three variants.
//!
//! All structural work happens in [`InMemoryTree`]. [`PersistentTree`]
//! wraps it with annotated nodes and a log writer, [`NoopTree`] ignores
//! everything, and [`ExecutionTree`] selects one of them once from
//! configuration.

use extree_core::{
    BranchType, Error, NodeId, NodeKey, PathState, Result, StateRef, TerminationKind, TreeConfig,
};
use extree_log::{Codec, FsStorage, LogRecord, LogStorage, PersistenceWriter};

use crate::arena::NodeArena;
use crate::ids::IdAllocator;
use crate::node::{Annotation, TreeNode};
use crate::tagged::{TagMask, TaggedRef};

/// Receives the live tree on every dump.
pub trait TreeSink<S> {
    fn export(&mut self, tree: &InMemoryTree<S>);
}

/// Operations every tree variant supports.
///
/// `attach` and `remove` assert their preconditions; a violation is an
/// engine bug and panics.
pub trait SearchTree<S: PathState> {
    /// Fork the frontier leaf `node` into two leaves bookmarking `left` and
    /// `right`. `right` must be the state currently at `node`.
    fn attach(&mut self, node: NodeKey, left: &StateRef<S>, right: &StateRef<S>, reason: BranchType);

    /// Drop the frontier leaf `node` and every ancestor left childless.
    fn remove(&mut self, node: NodeKey);

    /// Hand the live tree to `sink` without changing its structure.
    fn dump(&mut self, sink: &mut dyn TreeSink<S>);

    /// Register a searcher and return its tag bit.
    fn next_id(&mut self) -> Result<TagMask>;

    /// Record why the path at `state`'s node is about to terminate.
    fn set_termination_kind(&mut self, state: &S, kind: TerminationKind);
}

/// Tree used when no tracking is requested.
#[derive(Debug, Default)]
pub struct NoopTree {
    ids: IdAllocator,
}

impl<S: PathState> SearchTree<S> for NoopTree {
    fn attach(&mut self, _: NodeKey, _: &StateRef<S>, _: &StateRef<S>, _: BranchType) {}

    fn remove(&mut self, _: NodeKey) {}

    fn dump(&mut self, _: &mut dyn TreeSink<S>) {}

    fn next_id(&mut self) -> Result<TagMask> {
        self.ids.next_id()
    }

    fn set_termination_kind(&mut self, _: &S, _: TerminationKind) {}
}

#[derive(Debug)]
pub struct InMemoryTree<S> {
    nodes: NodeArena<TreeNode<S>>,
    root: TaggedRef,
    compress: bool,
    annotated: bool,
    next_node_id: u64,
    ids: IdAllocator,
}

impl<S: PathState> InMemoryTree<S> {
    /// Tree with a single root leaf bookmarking `initial`.
    pub fn new(initial: &StateRef<S>, compress: bool) -> Self {
        Self::build(initial, compress, false)
    }

    fn annotated(initial: &StateRef<S>, compress: bool) -> Self {
        Self::build(initial, compress, true)
    }

    fn build(initial: &StateRef<S>, compress: bool, annotated: bool) -> Self {
        let mut tree = Self {
            nodes: NodeArena::new(),
            root: TaggedRef::null(),
            compress,
            annotated,
            next_node_id: 1,
            ids: IdAllocator::new(),
        };
        let root = tree.create_node(None, initial);
        tree.root = TaggedRef::new(root);
        tree
    }

    fn create_node(&mut self, parent: Option<NodeKey>, state: &StateRef<S>) -> NodeKey {
        let mut node = TreeNode::new(parent, state);
        if self.annotated {
            node.annotation = Some(Annotation::new(NodeId::new(self.next_node_id)));
            self.next_node_id += 1;
        }
        let key = self.nodes.insert(node);
        state.borrow_mut().set_tree_node(Some(key));
        key
    }

    fn live_mut(&mut self, key: NodeKey) -> &mut TreeNode<S> {
        match self.nodes.get_mut(key) {
            Some(n) => n,
            None => panic!("{key} is not a live tree node"),
        }
    }

    /// Structural attach. Returns the new `(left, right)` leaves.
    fn attach_node(
        &mut self,
        node: NodeKey,
        left_state: &StateRef<S>,
        right_state: &StateRef<S>,
        reason: BranchType,
    ) -> (NodeKey, NodeKey) {
        assert!(self.live_mut(node).is_leaf(), "attach on internal node {node}");
        assert_eq!(
            right_state.borrow().tree_node(),
            Some(node),
            "attach assumes the right state is the current state"
        );

        // The continuing path keeps the searchers that pointed at `node`.
        let tag = self.incoming_tag(node);
        let source_line = right_state.borrow().prev_pc_line().unwrap_or(0);
        let left = self.create_node(Some(node), left_state);
        let right = self.create_node(Some(node), right_state);

        let n = self.live_mut(node);
        n.left = TaggedRef::new(left);
        n.right = TaggedRef::with_tag(right, tag);
        if let Some(a) = n.annotation.as_mut() {
            a.branch_reason = reason;
            a.source_line = source_line;
        }
        n.state = None;

        tracing::trace!(%node, %left, %right, ?reason, tag, "attach");
        (left, right)
    }

    /// Structural remove. Returns the terminated leaf's annotation.
    fn remove_node(&mut self, node: NodeKey) -> Option<Annotation> {
        let n = self.live_mut(node);
        assert!(n.is_leaf(), "remove on internal node {node}");

        let state = n.state.take().and_then(|w| w.upgrade());
        if let (Some(a), Some(s)) = (n.annotation.as_mut(), state.as_ref()) {
            let s = s.borrow();
            a.source_line = s.prev_pc_line().unwrap_or(0);
            a.state_id = Some(s.id());
        }
        let terminated = n.annotation;
        if let Some(s) = state {
            if let Ok(mut s) = s.try_borrow_mut() {
                if s.tree_node() == Some(node) {
                    s.set_tree_node(None);
                }
            }
        }

        let mut current = node;
        let mut pruned = 0usize;
        let survivor = loop {
            let parent = self.nodes.remove(current).and_then(|n| n.parent);
            pruned += 1;
            let Some(p) = parent else {
                self.root = TaggedRef::null();
                break None;
            };
            let pn = self.live_mut(p);
            if let Some(edge) = pn.edge_to_mut(current) {
                *edge = TaggedRef::null();
            }
            if !pn.is_leaf() {
                break Some(p);
            }
            current = p;
        };

        if let (Some(n), true) = (survivor, self.compress) {
            self.splice_out(n);
        }

        tracing::trace!(%node, pruned, live = self.nodes.len(), "remove");
        terminated
    }

    /// Replace a single-child node by its child. The child keeps its own
    /// tag; the eliminated edge's tag is dropped.
    fn splice_out(&mut self, key: NodeKey) {
        match self.nodes.get(key) {
            Some(n) if n.left.is_null() != n.right.is_null() => {}
            _ => return,
        }
        let Some(node) = self.nodes.remove(key) else {
            return;
        };
        let child = if node.left.is_null() { node.right } else { node.left };
        let Some(child_key) = child.pointer() else {
            return;
        };

        if let Some(c) = self.nodes.get_mut(child_key) {
            c.parent = node.parent;
        }
        match node.parent {
            None => self.root = child,
            Some(p) => {
                if let Some(edge) = self.live_mut(p).edge_to_mut(key) {
                    *edge = child;
                }
            }
        }
    }

    pub fn root(&self) -> TaggedRef {
        self.root
    }

    pub fn root_key(&self) -> Option<NodeKey> {
        self.root.pointer()
    }

    pub fn node(&self, key: NodeKey) -> Option<&TreeNode<S>> {
        self.nodes.get(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn compresses(&self) -> bool {
        self.compress
    }

    /// Tag on the edge leading into `key` (the root edge for the root).
    pub fn incoming_tag(&self, key: NodeKey) -> TagMask {
        match self.nodes.get(key).map(|n| n.parent) {
            Some(Some(p)) => self
                .nodes
                .get(p)
                .and_then(|pn| pn.edge_to(key))
                .map_or(0, |e| e.tag()),
            Some(None) if self.root.points_to(key) => self.root.tag(),
            _ => 0,
        }
    }

    pub(crate) fn incoming_edge_mut(&mut self, key: NodeKey) -> Option<&mut TaggedRef> {
        match self.nodes.get(key)?.parent {
            Some(p) => self.nodes.get_mut(p)?.edge_to_mut(key),
            None if self.root.points_to(key) => Some(&mut self.root),
            None => None,
        }
    }

    /// State-bearing leaves reachable from the root, left to right.
    pub fn frontier(&self) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.root.pointer().into_iter().collect();
        while let Some(key) = stack.pop() {
            let Some(n) = self.nodes.get(key) else {
                continue;
            };
            if n.is_leaf() {
                if n.has_state() {
                    out.push(key);
                }
                continue;
            }
            stack.extend(n.right.pointer());
            stack.extend(n.left.pointer());
        }
        out
    }

    /// Check parent back-references, that exactly the leaves hold states,
    /// that every node is reachable, and, under compression, that no node
    /// has a single child.
    pub fn validate(&self) -> Result<()> {
        let mut seen = 0usize;
        let mut stack: Vec<(NodeKey, Option<NodeKey>)> =
            self.root.pointer().map(|r| (r, None)).into_iter().collect();
        while let Some((key, parent)) = stack.pop() {
            let n = self
                .nodes
                .get(key)
                .ok_or_else(|| Error::Invariant(format!("dangling edge to {key}")))?;
            seen += 1;
            if n.parent != parent {
                return Err(Error::Invariant(format!("{key} has a stale parent")));
            }
            if !n.is_leaf() && n.state.is_some() {
                return Err(Error::Invariant(format!("internal node {key} holds a state")));
            }
            if n.is_leaf() && n.state.is_none() {
                return Err(Error::Invariant(format!("leaf {key} holds no state")));
            }
            if self.compress && n.left.is_null() != n.right.is_null() {
                return Err(Error::Invariant(format!("{key} has a single child")));
            }
            for child in n.children() {
                stack.push((child, Some(key)));
            }
        }
        if seen != self.nodes.len() {
            return Err(Error::Invariant(format!(
                "{} nodes unreachable from the root",
                self.nodes.len() - seen
            )));
        }
        Ok(())
    }

    fn annotate_termination(&mut self, state: &S, kind: TerminationKind) {
        let annotation = state
            .tree_node()
            .and_then(|k| self.nodes.get_mut(k))
            .and_then(|n| n.annotation.as_mut());
        if let Some(a) = annotation {
            a.termination_kind = kind;
        }
    }
}

impl<S: PathState> SearchTree<S> for InMemoryTree<S> {
    fn attach(&mut self, node: NodeKey, left: &StateRef<S>, right: &StateRef<S>, reason: BranchType) {
        self.attach_node(node, left, right, reason);
    }

    fn remove(&mut self, node: NodeKey) {
        self.remove_node(node);
    }

    fn dump(&mut self, sink: &mut dyn TreeSink<S>) {
        sink.export(self);
        tracing::debug!(nodes = self.nodes.len(), "dumped execution tree");
    }

    fn next_id(&mut self) -> Result<TagMask> {
        self.ids.next_id()
    }

    fn set_termination_kind(&mut self, state: &S, kind: TerminationKind) {
        self.annotate_termination(state, kind);
    }
}

/// In-memory tree with annotated nodes whose branches and terminations are
/// also appended to the tree log.
pub struct PersistentTree<S> {
    tree: InMemoryTree<S>,
    writer: Option<PersistenceWriter>,
}

impl<S: PathState> PersistentTree<S> {
    /// Wrap a fresh annotated tree. Without a writer the tree still works
    /// but nothing is persisted.
    pub fn new(initial: &StateRef<S>, compress: bool, writer: Option<PersistenceWriter>) -> Self {
        let mut this = Self {
            tree: InMemoryTree::annotated(initial, compress),
            writer,
        };
        let root = this
            .tree
            .root_key()
            .and_then(|k| this.tree.node(k))
            .and_then(|n| n.annotation);
        if let Some(a) = root {
            this.log(LogRecord::Root { id: a.id });
        }
        this
    }

    /// Open the log at `config.log_path()` on `storage`. A log that cannot
    /// be opened is reported and persistence is skipped.
    pub fn open(config: &TreeConfig, initial: &StateRef<S>, storage: Box<dyn LogStorage>) -> Self {
        let path = config.log_path().to_string_lossy().into_owned();
        let writer = Codec::from_name(&config.log_compression).and_then(|codec| {
            PersistenceWriter::create(storage, path.clone(), codec, config.log_batch_size)
        });
        let writer = match writer {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::error!(%path, error = %e, "cannot open tree log, persistence disabled");
                None
            }
        };
        Self::new(initial, config.compress_tree, writer)
    }

    fn log(&mut self, record: LogRecord) {
        if let Some(w) = self.writer.as_mut() {
            if let Err(e) = w.write(record) {
                tracing::error!(path = w.path(), error = %e, "tree log write failed");
            }
        }
    }

    fn annotation_of(&self, key: NodeKey) -> Option<Annotation> {
        self.tree.node(key).and_then(|n| n.annotation)
    }

    /// Force pending records to storage.
    pub fn commit(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            if let Err(e) = w.batch_commit(true) {
                tracing::error!(path = w.path(), error = %e, "tree log commit failed");
            }
        }
    }

    pub fn tree(&self) -> &InMemoryTree<S> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut InMemoryTree<S> {
        &mut self.tree
    }

    pub fn writer(&self) -> Option<&PersistenceWriter> {
        self.writer.as_ref()
    }
}

impl<S: PathState> SearchTree<S> for PersistentTree<S> {
    fn attach(&mut self, node: NodeKey, left: &StateRef<S>, right: &StateRef<S>, reason: BranchType) {
        let (l, r) = self.tree.attach_node(node, left, right, reason);
        let ids = (
            self.annotation_of(node),
            self.annotation_of(l),
            self.annotation_of(r),
        );
        if let (Some(n), Some(l), Some(r)) = ids {
            self.log(LogRecord::Branch {
                id: n.id,
                left: l.id,
                right: r.id,
                source_line: n.source_line,
                reason: n.branch_reason,
            });
        }
    }

    fn remove(&mut self, node: NodeKey) {
        if let Some(a) = self.tree.remove_node(node) {
            self.log(LogRecord::Terminate {
                id: a.id,
                state: a.state_id,
                source_line: a.source_line,
                kind: a.termination_kind,
            });
        }
    }

    fn dump(&mut self, sink: &mut dyn TreeSink<S>) {
        self.commit();
        self.tree.dump(sink);
    }

    fn next_id(&mut self) -> Result<TagMask> {
        self.tree.next_id()
    }

    fn set_termination_kind(&mut self, state: &S, kind: TerminationKind) {
        self.tree.annotate_termination(state, kind);
    }
}

/// The variant chosen at construction.
pub enum ExecutionTree<S> {
    Noop(NoopTree),
    InMemory(InMemoryTree<S>),
    Persistent(PersistentTree<S>),
}

impl<S: PathState> ExecutionTree<S> {
    /// Persistent when `config.persist_tree`, otherwise in-memory when
    /// `in_memory`, otherwise a no-op tree.
    pub fn create(config: &TreeConfig, initial: &StateRef<S>, in_memory: bool) -> Self {
        Self::create_with_storage(config, initial, in_memory, Box::new(FsStorage::new()))
    }

    pub fn create_with_storage(
        config: &TreeConfig,
        initial: &StateRef<S>,
        in_memory: bool,
        storage: Box<dyn LogStorage>,
    ) -> Self {
        if config.persist_tree {
            ExecutionTree::Persistent(PersistentTree::open(config, initial, storage))
        } else if in_memory {
            ExecutionTree::InMemory(InMemoryTree::new(initial, config.compress_tree))
        } else {
            ExecutionTree::Noop(NoopTree::default())
        }
    }

    /// The live structure, absent for the no-op tree.
    pub fn structure(&self) -> Option<&InMemoryTree<S>> {
        match self {
            ExecutionTree::Noop(_) => None,
            ExecutionTree::InMemory(t) => Some(t),
            ExecutionTree::Persistent(t) => Some(t.tree()),
        }
    }

    pub fn structure_mut(&mut self) -> Option<&mut InMemoryTree<S>> {
        match self {
            ExecutionTree::Noop(_) => None,
            ExecutionTree::InMemory(t) => Some(t),
            ExecutionTree::Persistent(t) => Some(t.tree_mut()),
        }
    }

    fn inner(&mut self) -> &mut dyn SearchTree<S> {
        match self {
            ExecutionTree::Noop(t) => t,
            ExecutionTree::InMemory(t) => t,
            ExecutionTree::Persistent(t) => t,
        }
    }
}

impl<S: PathState> SearchTree<S> for ExecutionTree<S> {
    fn attach(&mut self, node: NodeKey, left: &StateRef<S>, right: &StateRef<S>, reason: BranchType) {
        self.inner().attach(node, left, right, reason);
    }

    fn remove(&mut self, node: NodeKey) {
        self.inner().remove(node);
    }

    fn dump(&mut self, sink: &mut dyn TreeSink<S>) {
        self.inner().dump(sink);
    }

    fn next_id(&mut self) -> Result<TagMask> {
        self.inner().next_id()
    }

    fn set_termination_kind(&mut self, state: &S, kind: TerminationKind) {
        self.inner().set_termination_kind(state, kind);
    }
}
