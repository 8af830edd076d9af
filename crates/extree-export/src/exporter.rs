//! Builds and maintains the snapshot from the live tree.

use std::fs;
use std::io::Write;
use std::path::Path;

use extree_core::hash::Hash256;
use extree_core::{NodeKey, PathState, TreeConfig};
use extree_tree::{InMemoryTree, TreeNode, TreeSink};

use crate::error::Result;
use crate::infix::{normalize_whitespace, to_infix};
use crate::snapshot::{MemoryObjectDump, Snapshot, SnapshotRecord, StateAttributes};
use crate::stream::SnapshotStream;

/// Owner of the run's snapshot.
///
/// The snapshot lives as long as the exporter and only grows; [`reset`]
/// is for starting a new run with the same exporter.
///
/// [`reset`]: Exporter::reset
pub struct Exporter {
    snapshot: Snapshot,
    last_digest: Option<Hash256>,
    stream: Option<SnapshotStream<Box<dyn Write>>>,
    exports: u64,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::new(),
            last_digest: None,
            stream: None,
            exports: 0,
        }
    }

    /// Exporter that writes each changed snapshot as one line to `writer`.
    pub fn with_stream(writer: impl Write + 'static) -> Self {
        Self {
            stream: Some(SnapshotStream::to_writer(Box::new(writer))),
            ..Self::new()
        }
    }

    /// Streams to stdout when `config.stream_snapshots` is set.
    pub fn from_config(config: &TreeConfig) -> Self {
        if config.stream_snapshots {
            Self::with_stream(std::io::stdout())
        } else {
            Self::new()
        }
    }

    pub fn reset(&mut self) {
        self.snapshot = Snapshot::new();
        self.last_digest = None;
        self.exports = 0;
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }

    pub fn exports(&self) -> u64 {
        self.exports
    }

    /// Merge the current tree into the snapshot. Returns whether the
    /// snapshot changed; a changed snapshot is also streamed.
    pub fn export_tree<S: PathState>(&mut self, tree: &InMemoryTree<S>) -> bool {
        let mut visited = 0usize;
        let mut stack: Vec<NodeKey> = tree.root_key().into_iter().collect();
        while let Some(key) = stack.pop() {
            let Some(node) = tree.node(key) else {
                continue;
            };
            visited += 1;
            self.snapshot.upsert(record_for(key, node));
            stack.extend(node.left().pointer());
            stack.extend(node.right().pointer());
        }
        self.exports += 1;

        let digest = match self.snapshot.digest() {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::error!(error = %e, "cannot hash snapshot");
                None
            }
        };
        let changed = digest.is_none() || digest != self.last_digest;
        self.last_digest = digest;

        if changed {
            if let Some(stream) = self.stream.as_mut() {
                if let Err(e) = stream.write_snapshot(&self.snapshot) {
                    tracing::error!(error = %e, "cannot stream snapshot");
                }
            }
        }
        tracing::debug!(
            visited,
            records = self.snapshot.len(),
            changed,
            "exported execution tree"
        );
        changed
    }

    /// Write the pretty-printed snapshot to `path`.
    pub fn write_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.snapshot.to_json_pretty()?)?;
        tracing::debug!(path = %path.display(), records = self.snapshot.len(), "wrote snapshot");
        Ok(())
    }

    /// Like [`Exporter::write_json_file`], but a failure is reported and
    /// skipped. Returns whether the file was written.
    pub fn flush_to(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.write_json_file(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "unable to write snapshot");
                false
            }
        }
    }
}

impl<S: PathState> TreeSink<S> for Exporter {
    fn export(&mut self, tree: &InMemoryTree<S>) {
        self.export_tree(tree);
    }
}

fn record_for<S: PathState>(key: NodeKey, node: &TreeNode<S>) -> SnapshotRecord {
    let state = node.state();
    // A state the engine is mutating right now is exported without attributes.
    let attributes = state
        .as_ref()
        .and_then(|s| s.try_borrow().ok())
        .map(|s| state_attributes(&*s));
    SnapshotRecord {
        name: key.to_string(),
        children: node.children().map(|c| c.to_string()).collect(),
        state: attributes,
    }
}

fn state_attributes<S: PathState>(state: &S) -> StateAttributes {
    let constraints = state
        .constraints()
        .iter()
        .map(|c| to_infix(&normalize_whitespace(c)))
        .collect();
    let memory_objects = state
        .memory_objects()
        .into_iter()
        .map(|mo| MemoryObjectDump {
            address: mo.base_address(),
            size: mo.size(),
            name: mo.name().to_string(),
            bytes: (0..mo.size())
                .map(|i| normalize_whitespace(&mo.read_byte(i)))
                .collect(),
        })
        .collect();

    StateAttributes {
        id: state.id().get(),
        insts_since_cov_new: state.insts_since_cov_new(),
        pc: state.pc_location(),
        prev_pc: state.prev_pc_location(),
        stepped_instructions: state.stepped_instructions(),
        covered_lines: state.covered_lines().clone(),
        constraints,
        memory_objects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extree_core::{BasicMemoryObject, BasicState, BranchType};
    use extree_tree::SearchTree;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn state_attributes_are_rendered() {
        let mut s = BasicState::new(3);
        s.pc = "main.c:7".into();
        s.constraints.push("(Eq false\n  (Slt (ReadLSB w32 0 y) 5))".into());
        s.memory.push(BasicMemoryObject {
            name: "y".into(),
            base_address: "1024".into(),
            bytes: vec!["(Read w8 0  y)".into()],
        });
        s.covered_lines.entry("main.c".into()).or_default().insert(7);
        let s0 = s.into_ref();
        let tree = InMemoryTree::new(&s0, false);

        let mut exporter = Exporter::new();
        assert!(exporter.export_tree(&tree));

        let root = tree.root_key().unwrap().to_string();
        let attrs = exporter.snapshot().get(&root).unwrap().state.clone().unwrap();
        assert_eq!(attrs.id, 3);
        assert_eq!(attrs.constraints, vec!["y >= 5"]);
        assert_eq!(attrs.memory_objects[0].bytes, vec!["(Read w8 0 y)"]);
        assert_eq!(attrs.memory_objects[0].size, 1);
        assert!(attrs.covered_lines["main.c"].contains(&7));
    }

    #[test]
    fn pruned_nodes_stay_in_the_snapshot() {
        let s0 = BasicState::new(0).into_ref();
        let s1 = BasicState::new(1).into_ref();
        let mut tree = InMemoryTree::new(&s0, false);
        let root = tree.root_key().unwrap();
        tree.attach(root, &s1, &s0, BranchType::Conditional);

        let mut exporter = Exporter::new();
        tree.dump(&mut exporter);
        assert_eq!(exporter.snapshot().len(), 3);

        let leaf = s1.borrow().tree_node().unwrap();
        tree.remove(leaf);
        tree.dump(&mut exporter);

        let snapshot = exporter.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.get(&leaf.to_string()).is_some());
        assert_eq!(snapshot.get(&root.to_string()).unwrap().children.len(), 2);
        assert_eq!(exporter.exports(), 2);
    }

    #[test]
    fn only_changed_snapshots_are_streamed() {
        let buf = SharedBuf::default();
        let s0 = BasicState::new(0).into_ref();
        let s1 = BasicState::new(1).into_ref();
        let mut tree = InMemoryTree::new(&s0, false);
        let mut exporter = Exporter::with_stream(buf.clone());

        assert!(exporter.export_tree(&tree));
        assert!(!exporter.export_tree(&tree));
        let root = tree.root_key().unwrap();
        tree.attach(root, &s1, &s0, BranchType::Conditional);
        assert!(exporter.export_tree(&tree));

        let out = String::from_utf8(buf.0.borrow().clone()).unwrap();
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn snapshot_file_is_written_and_failures_are_skipped() {
        let dir = std::env::temp_dir().join(format!("extree-export-{}", std::process::id()));
        let path = dir.join("nested").join("exec_tree.json");
        let s0 = BasicState::new(0).into_ref();
        let tree = InMemoryTree::new(&s0, false);
        let mut exporter = Exporter::new();
        exporter.export_tree(&tree);

        assert!(exporter.flush_to(&path));
        let back = Snapshot::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(&back, exporter.snapshot());

        // A directory where the file should be.
        assert!(!exporter.flush_to(&dir));
        let _ = fs::remove_dir_all(&dir);
    }
}
