//! Offline reconstruction of the execution tree from its log.
//!
//! Unlike the live tree, the replayed tree never prunes: every node the run
//! ever created is present, which is what the inspection tools want.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use extree_core::{BranchType, NodeId, StateId, TerminationKind};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::record::LogRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Termination {
    pub state: Option<StateId>,
    pub kind: TerminationKind,
    pub source_line: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// `(left, right)` once the node has branched.
    pub children: Option<(NodeId, NodeId)>,
    pub reason: Option<BranchType>,
    pub branch_line: Option<u64>,
    pub termination: Option<Termination>,
}

impl ReplayNode {
    fn new(id: NodeId, parent: Option<NodeId>) -> Self {
        Self {
            id,
            parent,
            children: None,
            reason: None,
            branch_line: None,
            termination: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub nodes: usize,
    pub branches: usize,
    pub terminated: usize,
    /// Leaves that never saw a termination record.
    pub open_leaves: usize,
    pub max_depth: usize,
    pub terminations_by_kind: BTreeMap<String, usize>,
    pub branches_by_reason: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ReplayedTree {
    root: Option<NodeId>,
    nodes: BTreeMap<NodeId, ReplayNode>,
}

impl ReplayedTree {
    /// Rebuild the tree, validating that every record applies to a node in
    /// the state the live tree would have had.
    pub fn from_records(records: &[LogRecord]) -> Result<Self> {
        let mut tree = ReplayedTree::default();
        for (pos, record) in records.iter().enumerate() {
            tree.apply(record)
                .map_err(|e| Error::Replay(format!("record {pos}: {e}")))?;
        }
        Ok(tree)
    }

    fn apply(&mut self, record: &LogRecord) -> std::result::Result<(), String> {
        match record {
            LogRecord::Root { id } => {
                if let Some(root) = self.root {
                    return Err(format!("second root {} (first was {})", id.get(), root.get()));
                }
                self.root = Some(*id);
                self.nodes.insert(*id, ReplayNode::new(*id, None));
            }
            LogRecord::Branch {
                id,
                left,
                right,
                source_line,
                reason,
            } => {
                if left == right || self.nodes.contains_key(left) || self.nodes.contains_key(right) {
                    return Err(format!("branch of {} reuses a child id", id.get()));
                }
                let node = self
                    .nodes
                    .get_mut(id)
                    .ok_or_else(|| format!("branch of unknown node {}", id.get()))?;
                if !node.is_leaf() || node.termination.is_some() {
                    return Err(format!("branch of non-leaf node {}", id.get()));
                }
                node.children = Some((*left, *right));
                node.reason = Some(*reason);
                node.branch_line = Some(*source_line);
                self.nodes.insert(*left, ReplayNode::new(*left, Some(*id)));
                self.nodes.insert(*right, ReplayNode::new(*right, Some(*id)));
            }
            LogRecord::Terminate {
                id,
                state,
                source_line,
                kind,
            } => {
                let node = self
                    .nodes
                    .get_mut(id)
                    .ok_or_else(|| format!("termination of unknown node {}", id.get()))?;
                if !node.is_leaf() || node.termination.is_some() {
                    return Err(format!("termination of non-leaf node {}", id.get()));
                }
                node.termination = Some(Termination {
                    state: *state,
                    kind: *kind,
                    source_line: *source_line,
                });
            }
        }
        Ok(())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&ReplayNode> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order (node, depth) pairs, left before right.
    fn preorder(&self) -> Vec<(&ReplayNode, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|r| (r, 0)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            out.push((node, depth));
            if let Some((left, right)) = node.children {
                stack.push((right, depth + 1));
                stack.push((left, depth + 1));
            }
        }
        out
    }

    pub fn stats(&self) -> ReplayStats {
        let mut stats = ReplayStats::default();
        for (node, depth) in self.preorder() {
            stats.nodes += 1;
            stats.max_depth = stats.max_depth.max(depth);
            if let Some(reason) = node.reason {
                stats.branches += 1;
                *stats.branches_by_reason.entry(reason.to_string()).or_default() += 1;
            }
            match node.termination {
                Some(t) => {
                    stats.terminated += 1;
                    *stats.terminations_by_kind.entry(t.kind.to_string()).or_default() += 1;
                }
                None if node.is_leaf() => stats.open_leaves += 1,
                None => {}
            }
        }
        stats
    }

    /// Graphviz rendering. Open leaves are green, error terminations red.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph G {\n");
        out.push_str("\tsize=\"10,7.5\";\n");
        out.push_str("\tratio=fill;\n");
        out.push_str("\trotate=90;\n");
        out.push_str("\tcenter = \"true\";\n");
        out.push_str("\tnode [style=\"filled\",width=.1,height=.1,fontname=\"Terminus\"]\n");
        out.push_str("\tedge [arrowsize=.3]\n");

        for (node, _) in self.preorder() {
            let id = node.id.get();
            let _ = write!(out, "\tn{id} [shape=diamond");
            match (node.reason, node.termination) {
                (Some(reason), _) => {
                    let line = node.branch_line.unwrap_or(0);
                    let _ = write!(out, ",label=\"{id}: {reason}@{line}\"");
                }
                (None, Some(t)) => {
                    let _ = write!(out, ",label=\"{id}: {}@{}\"", t.kind, t.source_line);
                    if t.kind.is_error() {
                        out.push_str(",fillcolor=red");
                    }
                }
                (None, None) => out.push_str(",fillcolor=green"),
            }
            out.push_str("];\n");
            if let Some((left, right)) = node.children {
                let _ = writeln!(out, "\tn{id} -> n{};", left.get());
                let _ = writeln!(out, "\tn{id} -> n{};", right.get());
            }
        }
        out.push_str("}\n");
        out
    }

    /// Nested `{name, children}` JSON, the shape tree visualizers consume.
    /// Built bottom-up so deep trees do not recurse.
    pub fn to_nested_json(&self) -> Value {
        let order = self.preorder();
        let mut built: BTreeMap<NodeId, Value> = BTreeMap::new();
        for (node, _) in order.iter().rev() {
            let mut obj = json!({ "name": node.id.get().to_string() });
            let mut children = Vec::new();
            if let Some((left, right)) = node.children {
                for child in [left, right] {
                    if let Some(v) = built.remove(&child) {
                        children.push(v);
                    }
                }
            }
            obj["children"] = Value::Array(children);
            if let Some(reason) = node.reason {
                obj["reason"] = json!(reason);
            }
            if let Some(t) = node.termination {
                obj["termination"] = json!(t);
            }
            built.insert(node.id, obj);
        }
        self.root
            .and_then(|r| built.remove(&r))
            .unwrap_or(Value::Null)
    }
}
