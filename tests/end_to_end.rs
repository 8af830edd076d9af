use extree::core::prelude::*;
use extree::export::Exporter;
use extree::log::{read_log, MemoryStorage, ReplayedTree};
use extree::tree::{ExecutionTree, InMemoryTree, SearchTree};

fn node_of(s: &StateRef<BasicState>) -> NodeKey {
    s.borrow().tree_node().expect("state is on the frontier")
}

fn state_id_at(tree: &InMemoryTree<BasicState>, key: NodeKey) -> Option<u32> {
    tree.node(key)?.state().map(|s| s.borrow().id)
}

#[test]
fn compressed_root_collapses_onto_the_surviving_path() {
    let s1 = BasicState::new(1).into_ref();
    let s2 = BasicState::new(2).into_ref();
    let mut tree = InMemoryTree::new(&s2, true);
    let r = tree.root_key().unwrap();

    tree.attach(r, &s1, &s2, BranchType::Conditional);
    let root = tree.node(r).unwrap();
    assert!(!root.is_leaf());
    assert_eq!(state_id_at(&tree, root.left().pointer().unwrap()), Some(1));
    assert_eq!(state_id_at(&tree, root.right().pointer().unwrap()), Some(2));

    tree.remove(node_of(&s1));
    tree.validate().unwrap();
    assert_eq!(tree.len(), 1);
    let new_root = tree.root_key().unwrap();
    assert!(tree.node(new_root).unwrap().is_leaf());
    assert_eq!(state_id_at(&tree, new_root), Some(2));
    assert!(s1.borrow().tree_node().is_none());
}

#[test]
fn uncompressed_root_keeps_its_right_child_until_it_terminates() {
    let s1 = BasicState::new(1).into_ref();
    let s2 = BasicState::new(2).into_ref();
    let mut tree = InMemoryTree::new(&s2, false);
    let r = tree.root_key().unwrap();
    tree.attach(r, &s1, &s2, BranchType::Conditional);

    tree.remove(node_of(&s1));
    tree.validate().unwrap();
    let root = tree.node(r).unwrap();
    assert!(root.left().is_null());
    assert!(!root.right().is_null());
    assert!(!root.is_leaf());
    assert_eq!(tree.len(), 2);

    tree.remove(node_of(&s2));
    assert!(tree.is_empty());
    assert!(tree.root_key().is_none());
}

#[test]
fn persisted_export_and_replay_agree() {
    let storage = MemoryStorage::new();
    let config = TreeConfig {
        persist_tree: true,
        compress_tree: true,
        output_dir: "out".into(),
        ..Default::default()
    };
    let s1 = BasicState::new(1).into_ref();
    let s2 = BasicState::new(2).into_ref();
    let mut exporter = Exporter::from_config(&config);
    {
        let mut tree = ExecutionTree::create_with_storage(&config, &s2, true, Box::new(storage.clone()));
        let r = tree.structure().unwrap().root_key().unwrap();
        s2.borrow_mut().prev_pc_line = Some(12);
        tree.attach(r, &s1, &s2, BranchType::Conditional);
        tree.dump(&mut exporter);

        tree.set_termination_kind(&s1.borrow(), TerminationKind::Exit);
        tree.remove(node_of(&s1));
        tree.dump(&mut exporter);
        assert_eq!(tree.structure().unwrap().len(), 1);
    }

    // The live tree pruned down to one node; the snapshot and the log
    // both still describe all three.
    assert_eq!(exporter.snapshot().len(), 3);
    let log = config.log_path();
    let contents = read_log(&storage, &log.to_string_lossy()).unwrap();
    let replayed = ReplayedTree::from_records(&contents.records).unwrap();
    let stats = replayed.stats();
    assert_eq!(stats.nodes, 3);
    assert_eq!(stats.terminated, 1);
    assert_eq!(stats.open_leaves, 1);

    let json = replayed.to_nested_json();
    assert_eq!(json["name"], "1");
    assert_eq!(json["children"][0]["termination"]["kind"], "Exit");
}
