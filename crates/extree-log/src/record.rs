//! Logical log records.
//!
//! The ordered record stream alone is enough to rebuild the tree: a `Root`
//! opens it, each `Branch` gives a live leaf its two children, and each
//! `Terminate` ends a leaf.

use extree_core::{BranchType, NodeId, RunId, StateId, TerminationKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogRecord {
    Root {
        id: NodeId,
    },
    Branch {
        id: NodeId,
        left: NodeId,
        right: NodeId,
        source_line: u64,
        reason: BranchType,
    },
    Terminate {
        id: NodeId,
        /// Absent when the state was already dropped at termination.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<StateId>,
        source_line: u64,
        kind: TerminationKind,
    },
}

impl LogRecord {
    /// Persisted id of the node this record annotates.
    pub fn node_id(&self) -> NodeId {
        match self {
            LogRecord::Root { id }
            | LogRecord::Branch { id, .. }
            | LogRecord::Terminate { id, .. } => *id,
        }
    }
}

/// Payload of one committed segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBatch {
    pub run: RunId,
    /// Position of this batch within the run, starting at 0.
    pub seq: u64,
    pub records: Vec<LogRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_tagged_in_json() {
        let r = LogRecord::Branch {
            id: NodeId::new(1),
            left: NodeId::new(2),
            right: NodeId::new(3),
            source_line: 12,
            reason: BranchType::Conditional,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "branch");
        assert_eq!(json["left"], 2);
        assert_eq!(r.node_id(), NodeId::new(1));
    }

    #[test]
    fn terminate_without_state_omits_the_field() {
        let r = LogRecord::Terminate {
            id: NodeId::new(2),
            state: None,
            source_line: 0,
            kind: TerminationKind::Exit,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("state").is_none());

        let back: LogRecord =
            serde_json::from_str(r#"{"type":"terminate","id":2,"source_line":0,"kind":"Exit"}"#)
                .unwrap();
        assert_eq!(back, r);
    }
}
