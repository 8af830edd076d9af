use extree::core::{BasicState, BranchType, NodeKey, PathState, StateRef, TreeConfig};
use extree::tree::{ExecutionTree, InMemoryTree, RandomPath, SearchTree, TAG_WIDTH};

/// Small deterministic generator so workloads are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

fn node_of(s: &StateRef<BasicState>) -> NodeKey {
    s.borrow().tree_node().expect("state is on the frontier")
}

fn frontier_ids(tree: &InMemoryTree<BasicState>) -> Vec<u32> {
    tree.frontier()
        .into_iter()
        .map(|k| tree.node(k).unwrap().state().unwrap().borrow().id)
        .collect()
}

/// One tree plus the states still alive in it.
struct Run {
    tree: InMemoryTree<BasicState>,
    states: Vec<StateRef<BasicState>>,
}

impl Run {
    fn new(compress: bool) -> Self {
        let s0 = BasicState::new(0).into_ref();
        Self {
            tree: InMemoryTree::new(&s0, compress),
            states: vec![s0],
        }
    }

    fn state_at(&self, pos: usize) -> StateRef<BasicState> {
        let key = self.tree.frontier()[pos];
        self.tree.node(key).unwrap().state().unwrap()
    }

    fn fork(&mut self, pos: usize, id: u32) {
        let current = self.state_at(pos);
        let forked = current.borrow().fork(id).into_ref();
        self.tree
            .attach(node_of(&current), &forked, &current, BranchType::Conditional);
        self.states.push(forked);
    }

    fn terminate(&mut self, pos: usize) {
        let current = self.state_at(pos);
        self.tree.remove(node_of(&current));
        self.states.retain(|s| !std::rc::Rc::ptr_eq(s, &current));
    }
}

#[test]
fn random_workload_keeps_the_tree_consistent() {
    let mut rng = Lcg(7);
    let mut plain = Run::new(false);
    let mut compressed = Run::new(true);
    let mut next_id = 1u32;

    for _ in 0..400 {
        let live = plain.states.len();
        if live == 0 {
            break;
        }
        let pos = rng.below(live);
        if live < 3 || rng.below(3) > 0 {
            plain.fork(pos, next_id);
            compressed.fork(pos, next_id);
            next_id += 1;
        } else {
            plain.terminate(pos);
            compressed.terminate(pos);
        }

        plain.tree.validate().unwrap();
        compressed.tree.validate().unwrap();
        // Compression changes the shape, never which states are reachable
        // or their left-to-right order.
        assert_eq!(frontier_ids(&plain.tree), frontier_ids(&compressed.tree));
        let leaves = compressed.states.len();
        assert_eq!(compressed.tree.len(), 2 * leaves - 1);
    }
    assert!(plain.tree.len() >= compressed.tree.len());
}

#[test]
fn removing_every_state_empties_the_tree() {
    for compress in [false, true] {
        let mut run = Run::new(compress);
        for id in 1..20u32 {
            let pos = id as usize % run.states.len();
            run.fork(pos, id);
        }
        while !run.states.is_empty() {
            run.terminate(0);
            run.tree.validate().unwrap();
        }
        assert!(run.tree.is_empty());
        assert!(run.tree.root().is_null());
    }
}

#[test]
fn continuing_path_inherits_searcher_tags() {
    let mut run = Run::new(false);
    let rp = RandomPath::new(&mut run.tree).unwrap();
    let root = run.tree.root_key().unwrap();
    rp.update(&mut run.tree, &[root], &[]);

    // Always fork the rightmost state: the right spine stays tagged.
    for id in 1..5u32 {
        let rightmost = run.states.len() - 1;
        run.fork(rightmost, id);
        assert_eq!(run.tree.incoming_tag(node_of(&run.states[0])), rp.mask());
        let forked = run.states.last().unwrap();
        assert_eq!(run.tree.incoming_tag(node_of(forked)), 0);
    }

    let picked = rp.select(&run.tree, || true).unwrap();
    assert_eq!(picked.borrow().id, 0);
}

#[test]
fn random_path_only_reaches_tracked_states() {
    let mut rng = Lcg(99);
    let mut run = Run::new(true);
    let rp = RandomPath::new(&mut run.tree).unwrap();
    let root = run.tree.root_key().unwrap();
    rp.update(&mut run.tree, &[root], &[]);
    let mut tracked = vec![0u32];

    for id in 1..40u32 {
        let pos = rng.below(run.states.len());
        run.fork(pos, id);
        if id % 2 == 0 {
            let forked = node_of(run.states.last().unwrap());
            rp.update(&mut run.tree, &[forked], &[]);
            tracked.push(id);
        }
    }

    for _ in 0..50 {
        let picked = rp.select(&run.tree, || rng.below(2) == 0).unwrap();
        assert!(tracked.contains(&picked.borrow().id));
    }
}

#[test]
fn tag_ids_run_out_after_the_tag_width() {
    let s0 = BasicState::new(0).into_ref();
    let mut tree = ExecutionTree::create(&TreeConfig::default(), &s0, true);
    let masks: Vec<_> = (0..TAG_WIDTH).map(|_| tree.next_id().unwrap()).collect();
    assert_eq!(masks.first(), Some(&1));
    assert_eq!(masks.last(), Some(&(1 << (TAG_WIDTH - 1))));
    assert!(tree.next_id().is_err());
}

#[test]
fn variant_follows_configuration() {
    let s0 = BasicState::new(0).into_ref();
    let config = TreeConfig {
        compress_tree: true,
        ..Default::default()
    };
    match ExecutionTree::create(&config, &s0, true) {
        ExecutionTree::InMemory(t) => assert!(t.compresses()),
        _ => panic!("expected the in-memory variant"),
    }
    assert!(matches!(
        ExecutionTree::create(&config, &s0, false),
        ExecutionTree::Noop(_)
    ));
}
