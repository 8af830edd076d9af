use std::fs;

use extree::core::{BasicMemoryObject, BasicState, BranchType, NodeKey, PathState, StateRef, TreeConfig};
use extree::export::{Exporter, Snapshot};
use extree::tree::{InMemoryTree, SearchTree};

fn node_of(s: &StateRef<BasicState>) -> NodeKey {
    s.borrow().tree_node().expect("state is on the frontier")
}

/// Every record of `before` is still in `after`, with its children as a
/// prefix of the newer child list.
fn assert_grows(before: &Snapshot, after: &Snapshot) {
    assert!(after.len() >= before.len());
    for record in before.records() {
        let newer = after
            .get(&record.name)
            .unwrap_or_else(|| panic!("{} was dropped", record.name));
        assert_eq!(&newer.children[..record.children.len()], &record.children[..]);
    }
}

#[test]
fn snapshots_only_grow_while_the_tree_shrinks() {
    for compress in [false, true] {
        let s0 = BasicState::new(0).into_ref();
        let mut live = vec![s0.clone()];
        let mut tree = InMemoryTree::new(&s0, compress);
        let mut exporter = Exporter::new();
        tree.dump(&mut exporter);
        let mut previous = exporter.snapshot().clone();

        for id in 1..25u32 {
            let current = live[(id as usize * 5) % live.len()].clone();
            let forked = current.borrow().fork(id).into_ref();
            tree.attach(node_of(&current), &forked, &current, BranchType::Conditional);
            live.push(forked);
            tree.dump(&mut exporter);
            assert_grows(&previous, exporter.snapshot());
            previous = exporter.snapshot().clone();

            if id % 4 == 0 {
                let victim = live.remove(0);
                tree.remove(node_of(&victim));
                tree.dump(&mut exporter);
                assert_grows(&previous, exporter.snapshot());
                previous = exporter.snapshot().clone();
            }
        }
        // Every node ever created was exported before it could be pruned.
        assert_eq!(exporter.snapshot().len(), 1 + 2 * 24);
        assert!(exporter.snapshot().len() > tree.len());
    }
}

#[test]
fn snapshot_keeps_the_last_seen_state_attributes() {
    let mut s = BasicState::new(0);
    s.pc = "main.c:3".into();
    s.constraints.push("(Eq false (Ult (ReadLSB w32 0 n) 10))".into());
    s.memory.push(BasicMemoryObject {
        name: "n".into(),
        base_address: "4096".into(),
        bytes: vec!["(Read w8 0 n)".into(); 4],
    });
    let s0 = s.into_ref();
    let mut tree = InMemoryTree::new(&s0, false);
    let root = tree.root_key().unwrap();
    let mut exporter = Exporter::new();
    tree.dump(&mut exporter);

    let s1 = s0.borrow().fork(1).into_ref();
    s0.borrow_mut().pc = "main.c:9".into();
    tree.attach(root, &s1, &s0, BranchType::Conditional);
    tree.dump(&mut exporter);

    let snapshot = exporter.snapshot();
    // The root no longer bookmarks a state, so it keeps what it had.
    let root_attrs = snapshot.get(&root.to_string()).unwrap().state.as_ref().unwrap();
    assert_eq!(root_attrs.pc, "main.c:3");
    assert_eq!(root_attrs.constraints, vec!["n >= 10"]);
    assert_eq!(root_attrs.memory_objects[0].size, 4);

    let right = snapshot.get(&node_of(&s0).to_string()).unwrap();
    assert_eq!(right.state.as_ref().unwrap().pc, "main.c:9");
}

#[test]
fn snapshot_file_merges_with_an_earlier_one() {
    let dir = std::env::temp_dir().join(format!("extree-export-tests-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    let config = TreeConfig {
        output_dir: dir.to_string_lossy().into_owned(),
        ..Default::default()
    };

    let s0 = BasicState::new(0).into_ref();
    let s1 = BasicState::new(1).into_ref();
    let mut tree = InMemoryTree::new(&s0, false);
    let mut exporter = Exporter::from_config(&config);
    tree.dump(&mut exporter);
    assert!(exporter.flush_to(config.snapshot_path()));
    let early = Snapshot::from_json(&fs::read_to_string(config.snapshot_path()).unwrap()).unwrap();

    let root = tree.root_key().unwrap();
    tree.attach(root, &s1, &s0, BranchType::Conditional);
    tree.dump(&mut exporter);
    let mut merged = early.clone();
    assert!(merged.merge(exporter.snapshot().clone()));
    assert_eq!(&merged, exporter.snapshot());
    assert!(!merged.merge(early));

    let _ = fs::remove_dir_all(&dir);
}
