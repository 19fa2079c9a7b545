use std::{cell::RefCell, ops::Range, rc::Rc};

use proptest::prelude::*;

use crate::model::{self, tree_of, TestNode};

use super::*;

fn init_logging() {
    use simplelog::*;

    // Another test may have installed the logger already.
    let _ = TestLogger::init(LevelFilter::Trace, Config::default());
}

fn keys(tree: &RbTree<TestNode>) -> Vec<u32> {
    tree.iter().map(|node| node.key).collect()
}

fn insert_find_all(keys: &[u32]) {
    let mut tree: RbTree<TestNode> = RbTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_none());
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn four_elems_find() {
    insert_find_all(&[0, 1, 2, 3]);
    insert_find_all(&[0, 1, 3, 2]);
    insert_find_all(&[0, 2, 1, 3]);
    insert_find_all(&[0, 2, 3, 1]);
    insert_find_all(&[0, 3, 1, 2]);
    insert_find_all(&[0, 3, 2, 1]);

    insert_find_all(&[1, 0, 2, 3]);
    insert_find_all(&[1, 0, 3, 2]);
    insert_find_all(&[1, 2, 0, 3]);
    insert_find_all(&[1, 2, 3, 0]);
    insert_find_all(&[1, 3, 0, 2]);
    insert_find_all(&[1, 3, 2, 0]);

    insert_find_all(&[2, 0, 1, 3]);
    insert_find_all(&[2, 0, 3, 1]);
    insert_find_all(&[2, 1, 0, 3]);
    insert_find_all(&[2, 1, 3, 0]);
    insert_find_all(&[2, 3, 0, 1]);
    insert_find_all(&[2, 3, 1, 0]);

    insert_find_all(&[3, 0, 1, 2]);
    insert_find_all(&[3, 0, 2, 1]);
    insert_find_all(&[3, 1, 0, 2]);
    insert_find_all(&[3, 1, 2, 0]);
    insert_find_all(&[3, 2, 0, 1]);
    insert_find_all(&[3, 2, 1, 0]);
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: RbTree<TestNode> = RbTree::new();

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        unsafe { tree.remove_at(node) };
        tree.assert_invariants();
    }

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let node = tree.get_raw(key).expect("item not found");
        unsafe { tree.remove_at(node) };
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_four() {
    insert_remove_all(&[0, 1, 2, 3]);
    insert_remove_all(&[0, 1, 3, 2]);
    insert_remove_all(&[0, 2, 1, 3]);
    insert_remove_all(&[0, 2, 3, 1]);
    insert_remove_all(&[0, 3, 1, 2]);
    insert_remove_all(&[0, 3, 2, 1]);

    insert_remove_all(&[1, 0, 2, 3]);
    insert_remove_all(&[1, 0, 3, 2]);
    insert_remove_all(&[1, 2, 0, 3]);
    insert_remove_all(&[1, 2, 3, 0]);
    insert_remove_all(&[1, 3, 0, 2]);
    insert_remove_all(&[1, 3, 2, 0]);

    insert_remove_all(&[2, 0, 1, 3]);
    insert_remove_all(&[2, 0, 3, 1]);
    insert_remove_all(&[2, 1, 0, 3]);
    insert_remove_all(&[2, 1, 3, 0]);
    insert_remove_all(&[2, 3, 0, 1]);
    insert_remove_all(&[2, 3, 1, 0]);

    insert_remove_all(&[3, 0, 1, 2]);
    insert_remove_all(&[3, 0, 2, 1]);
    insert_remove_all(&[3, 1, 0, 2]);
    insert_remove_all(&[3, 1, 2, 0]);
    insert_remove_all(&[3, 2, 0, 1]);
    insert_remove_all(&[3, 2, 1, 0]);
}

#[test]
fn remove_sequential() {
    let mut tree = tree_of(0..256);
    tree.assert_invariants();

    for key in (0..256u32).step_by(2) {
        assert_eq!(tree.remove(&key).map(|node| node.key), Some(key));
        tree.assert_invariants();
    }

    assert_eq!(keys(&tree), (1..256).step_by(2).collect::<Vec<_>>());
}

#[test]
fn black_height() {
    let mut tree: RbTree<TestNode> = RbTree::new();
    assert_eq!(tree.black_height(), 1);

    tree.insert(TestNode::new(0));
    assert_eq!(tree.black_height(), 2);

    // At least half the nodes on any path are black.
    let tree = tree_of(0..1023);
    let height = tree.black_height();
    assert!((2..=11).contains(&height), "black height {height}");
}

#[test]
fn duplicate_insert_is_rejected() {
    let mut tree: RbTree<TestNode> = RbTree::new();

    assert!(tree.insert(TestNode::new(5)).is_none());
    let before = tree.snapshot();

    let rejected = tree.insert(TestNode::new(5)).expect("duplicate was inserted");
    assert_eq!(rejected.key, 5);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.snapshot(), before);

    // The rejected node can be inserted elsewhere.
    let mut other: RbTree<TestNode> = RbTree::new();
    assert!(other.insert(rejected).is_none());
    other.assert_invariants();
}

#[test]
fn find_does_not_mutate() {
    let tree = tree_of([8, 3, 10, 1, 6, 14, 4, 7, 13]);
    let before = tree.snapshot();

    for key in 0..16 {
        let found = tree.contains_key(&key);
        assert_eq!(found, tree.contains_key(&key));
    }

    assert_eq!(tree.snapshot(), before);
}

#[test]
fn remove_absent_is_noop() {
    let mut tree = tree_of([8, 3, 10, 1, 6]);
    let before = tree.snapshot();

    assert!(tree.remove(&7).is_none());
    assert_eq!(tree.snapshot(), before);
    assert_eq!(tree.len(), 5);

    let mut empty: RbTree<TestNode> = RbTree::new();
    assert!(empty.remove(&7).is_none());
    assert!(empty.pop_first().is_none());
    assert!(empty.pop_last().is_none());
}

#[test]
fn rotate_without_child_is_noop() {
    let tree = tree_of([1]);
    let root = tree.root.expect("tree is not empty");
    let before = tree.snapshot();

    let up = unsafe { RbTree::<TestNode>::rotate_subtree(root, Dir::Left) };
    assert_eq!(up, root);
    assert_eq!(tree.snapshot(), before);
    tree.assert_invariants();
}

#[test]
fn snapshot_shape() {
    let tree = tree_of([1, 2, 3]);
    let snapshot = tree.snapshot();

    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.keys_in_order(), ["1", "2", "3"]);

    let root = snapshot.root().expect("snapshot is not empty");
    assert_eq!(root.key, "2");
    assert_eq!(root.color, Color::Black);
    assert_eq!(root.black_height, 2);
    assert_eq!(root.side, None);

    for (idx, side) in [(root.left, Dir::Left), (root.right, Dir::Right)] {
        let child = snapshot.get(idx.expect("root has two children")).expect("index in bounds");
        assert_eq!(child.color, Color::Red);
        assert_eq!(child.black_height, 1);
        assert_eq!(child.side, Some(side));
    }

    assert!(RbTree::<TestNode>::new().snapshot().is_empty());
}

#[test]
fn invariant_violations_are_reported() {
    let tree = tree_of([1, 2, 3]);
    let root = tree.root.expect("tree is not empty");
    assert_eq!(tree.check_invariants(), Ok(()));

    unsafe {
        RbTree::<TestNode>::links_mut(root).set_color(Color::Red);
        assert_eq!(tree.check_invariants(), Err(InvariantError::RedRoot));
        RbTree::<TestNode>::links_mut(root).set_color(Color::Black);

        RbTree::<TestNode>::links_mut(root).set_black_height(7);
        assert!(matches!(
            tree.check_invariants(),
            Err(InvariantError::StaleBlackHeight {
                cached: 7,
                actual: 2,
                ..
            })
        ));
        RbTree::<TestNode>::links_mut(root).set_black_height(2);

        let left = RbTree::<TestNode>::links(root).left().expect("root has a left child");
        RbTree::<TestNode>::links_mut(left).set_color(Color::Black);
        assert!(matches!(
            tree.check_invariants(),
            Err(InvariantError::StaleBlackHeight { .. })
                | Err(InvariantError::UnbalancedBlackHeight { .. })
        ));
        RbTree::<TestNode>::links_mut(left).set_color(Color::Red);
    }

    assert_eq!(tree.check_invariants(), Ok(()));
}

#[test]
fn scenario_insert_then_erase() {
    let mut set: RbSet<i32> = [1, 2, 5, 7, 8, 11, 14, 15].into_iter().collect();
    set.assert_invariants();

    assert!(set.insert(4));
    set.assert_invariants();

    for key in [4, 11, 7] {
        assert!(set.erase(&key));
        set.assert_invariants();
    }

    assert_eq!(set.iter().copied().collect::<Vec<_>>(), [1, 2, 5, 8, 14, 15]);
}

#[test]
fn scenario_erase_minimum() {
    let mut set: RbSet<i32> = [-14, 0, 3, 5, 11, 20, 21, 28, 42, 60].into_iter().collect();

    assert!(set.erase(&-14));
    set.assert_invariants();

    assert_eq!(
        set.iter().copied().collect::<Vec<_>>(),
        [0, 3, 5, 11, 20, 21, 28, 42, 60]
    );
}

#[test]
fn scenario_merge() {
    let mut a: RbSet<i32> = [7, 4, 11].into_iter().collect();
    let b: RbSet<i32> = [1, 2, 5, 8, 14, 15].into_iter().collect();

    a.merge(b);
    a.assert_invariants();

    assert_eq!(
        a.iter().copied().collect::<Vec<_>>(),
        [1, 2, 4, 5, 7, 8, 11, 14, 15]
    );
}

#[test]
fn join_around_uneven_heights() {
    init_logging();

    for (left, right) in [(0..100, 101..104), (0..3, 4..200), (0..0, 1..50), (0..50, 51..51)] {
        let pivot = left.end;
        let expected: Vec<u32> = left.clone().chain([pivot]).chain(right.clone()).collect();

        let mut tree = tree_of(left);
        tree.join_around(TestNode::new(pivot), tree_of(right));

        tree.assert_invariants();
        assert_eq!(keys(&tree), expected);
        assert_eq!(tree.len(), expected.len());
    }
}

#[test]
fn join_around_empty() {
    let mut tree: RbTree<TestNode> = RbTree::new();
    tree.join_around(TestNode::new(3), RbTree::new());

    tree.assert_invariants();
    assert_eq!(keys(&tree), [3]);
    assert_eq!(tree.black_height(), 2);
}

#[test]
fn join_whole_trees() {
    let mut tree = tree_of(0..40);
    tree.join(tree_of(40..45));
    tree.assert_invariants();
    assert_eq!(keys(&tree), (0..45).collect::<Vec<_>>());

    tree.join(RbTree::new());
    tree.assert_invariants();
    assert_eq!(tree.len(), 45);

    let mut empty: RbTree<TestNode> = RbTree::new();
    empty.join(tree);
    empty.assert_invariants();
    assert_eq!(keys(&empty), (0..45).collect::<Vec<_>>());
}

#[test]
fn split_partitions() {
    init_logging();

    let all: Vec<u32> = (0..64).map(|k| k * 2).collect();

    for key in 0..130 {
        let tree = tree_of(all.iter().copied());
        let split = tree.split(&key);

        split.less.assert_invariants();
        split.greater.assert_invariants();

        let less: Vec<u32> = all.iter().copied().filter(|&k| k < key).collect();
        let greater: Vec<u32> = all.iter().copied().filter(|&k| k > key).collect();

        assert_eq!(keys(&split.less), less, "split at {key}");
        assert_eq!(keys(&split.greater), greater, "split at {key}");
        assert_eq!(split.less.len(), less.len());
        assert_eq!(split.greater.len(), greater.len());
        assert_eq!(split.found.map(|node| node.key), (key % 2 == 0 && key < 128).then_some(key));
    }
}

#[test]
fn split_empty() {
    let split = RbTree::<TestNode>::new().split(&5);

    assert!(split.less.is_empty());
    assert!(split.found.is_none());
    assert!(split.greater.is_empty());
}

#[test]
fn split_then_join_round_trip() {
    for key in [0, 17, 50, 99, 100, 250] {
        let tree = tree_of((0..100).map(|k| k * 3 % 101));
        let expected = keys(&tree);

        let split = tree.split(&key);
        let mut rejoined = split.less;

        // Put the split key back as the pivot, whether or not it was present.
        let pivot = split.found.unwrap_or_else(|| TestNode::new(key));
        rejoined.join_around(pivot, split.greater);
        rejoined.assert_invariants();

        let mut with_key = expected.clone();
        if let Err(idx) = with_key.binary_search(&key) {
            with_key.insert(idx, key);
        }
        assert_eq!(keys(&rejoined), with_key);
    }
}

#[test]
fn merge_disjoint_and_overlapping() {
    init_logging();

    let mut tree = tree_of((0..60).step_by(3));
    let displaced = tree.merge(tree_of((0..60).step_by(2)));
    tree.assert_invariants();

    let expected: Vec<u32> = (0..60).filter(|k| k % 2 == 0 || k % 3 == 0).collect();
    assert_eq!(keys(&tree), expected);

    let mut displaced: Vec<u32> = displaced.into_iter().map(|node| node.key).collect();
    displaced.sort_unstable();
    assert_eq!(displaced, (0..60).step_by(6).collect::<Vec<_>>());

    // Merging with an empty tree on either side changes nothing.
    assert!(tree.merge(RbTree::new()).is_empty());
    tree.assert_invariants();
    assert_eq!(keys(&tree), expected);

    let mut empty: RbTree<TestNode> = RbTree::new();
    assert!(empty.merge(tree).is_empty());
    assert_eq!(keys(&empty), expected);
}

#[test]
fn merge_keeps_other_nodes() {
    let mut tree = tree_of([1, 2, 3]);
    let other = tree_of([2, 4]);

    let kept = other.get(&2).map(|node| node.get_ref() as *const TestNode);
    let replaced = tree.get(&2).map(|node| node.get_ref() as *const TestNode);

    let displaced = tree.merge(other);
    assert_eq!(displaced.len(), 1);
    assert_eq!(Some(&*displaced[0] as *const TestNode), replaced);
    assert_eq!(tree.get(&2).map(|node| node.get_ref() as *const TestNode), kept);

    tree.assert_invariants();
    assert_eq!(keys(&tree), [1, 2, 3, 4]);
}

#[test]
fn set_operations() {
    let mut set: RbSet<i32> = RbSet::new();
    assert!(set.is_empty());
    assert_eq!(set.first(), None);

    for key in [5, 3, 9, 1] {
        assert!(set.insert(key));
    }
    assert!(!set.insert(3));

    assert_eq!(set.len(), 4);
    assert!(set.find(&9));
    assert!(!set.find(&4));
    assert_eq!(set.get(&5), Some(&5));
    assert_eq!(set.first(), Some(&1));
    assert_eq!(set.last(), Some(&9));
    assert!(!set.erase(&4));

    assert_eq!(set.pop_first(), Some(1));
    assert_eq!(set.pop_last(), Some(9));
    assert_eq!(format!("{set:?}"), "{3, 5}");

    let copy = set.clone();
    assert_eq!(copy, set);
    copy.assert_invariants();

    set.extend([10, 11]);
    assert_ne!(copy, set);

    let (less, greater) = set.split(&5);
    assert_eq!(less.iter().copied().collect::<Vec<_>>(), [3]);
    assert_eq!(greater.iter().copied().collect::<Vec<_>>(), [10, 11]);

    let mut joined = less;
    joined.join(greater);
    joined.assert_invariants();
    assert_eq!(joined.iter().copied().collect::<Vec<_>>(), [3, 10, 11]);

    joined.clear();
    assert!(joined.is_empty());
    assert_eq!(joined.check_invariants(), Ok(()));
}

#[test]
fn set_with_borrowed_keys() {
    let mut set: RbSet<String> = ["pear", "apple", "fig"].iter().map(|s| s.to_string()).collect();

    assert!(set.find("fig"));
    assert!(set.erase("pear"));
    assert_eq!(set.iter().map(String::as_str).collect::<Vec<_>>(), ["apple", "fig"]);
}

#[test]
fn tracer_sees_mutations() {
    init_logging();

    let tracer = Rc::new(RefCell::new(DotTracer::new("t")));
    let mut set = RbSet::new();
    assert!(set.set_tracer(tracer.clone()).is_none());

    for key in [2, 1, 3] {
        set.insert(key);
    }

    // Lookups and failed mutations are not traced.
    set.find(&2);
    set.insert(2);
    set.erase(&7);
    assert_eq!(RefCell::borrow(&tracer).graphs().len(), 3);

    set.erase(&1);

    let graphs = tracer.borrow_mut().take_graphs();
    let mutations: Vec<Mutation> = graphs.iter().map(|(mutation, _)| *mutation).collect();
    assert_eq!(
        mutations,
        [
            Mutation::Insert,
            Mutation::Insert,
            Mutation::Insert,
            Mutation::Remove
        ]
    );

    let (_, first) = &graphs[0];
    assert!(first.starts_with("digraph \"graph-t0\""));
    assert!(first.contains("label=\"2:2\""));

    let (_, last) = &graphs[3];
    assert!(last.starts_with("digraph \"graph-t3\""));
    assert!(!last.contains("label=\"1:"));
}

#[test]
fn tracer_follows_split_and_merge() {
    let tracer = Rc::new(RefCell::new(DotTracer::new("s")));
    let mut set: RbSet<u32> = (0..10).collect();
    set.set_tracer(tracer.clone());

    let (mut less, greater) = set.split(&5);
    less.merge(greater);
    less.join((20..25).collect());
    less.assert_invariants();
    assert!(less.take_tracer().is_some());

    let mutations: Vec<Mutation> = RefCell::borrow(&tracer)
        .graphs()
        .iter()
        .map(|(mutation, _)| *mutation)
        .collect();
    assert_eq!(
        mutations,
        [
            Mutation::Split,
            Mutation::Split,
            Mutation::Merge,
            Mutation::Join
        ]
    );
}

#[test]
fn links_debug_shows_cached_state() {
    let tree = tree_of([1, 2]);
    let root = tree.root.expect("tree is not empty");

    let root_links = format!("{:?}", unsafe { RbTree::<TestNode>::links(root) });
    assert!(root_links.contains("side: None"), "{root_links}");
    assert!(root_links.contains("size: 2"), "{root_links}");

    let right = unsafe { RbTree::<TestNode>::links(root).right() }.expect("1 has a right child");
    let right_links = format!("{:?}", unsafe { RbTree::<TestNode>::links(right) });
    assert!(right_links.contains("side: Some(Right)"), "{right_links}");
    assert!(right_links.contains("size: 1"), "{right_links}");
}

#[test]
fn dotgraph_of_empty_snapshot() {
    let mut graph = String::new();
    Snapshot::default()
        .dotgraph("empty", &mut graph)
        .expect("writing to a String cannot fail");

    assert_eq!(graph, "digraph \"graph-empty\" {}");
}

#[test]
fn drop_releases_nodes() {
    let mut set: RbSet<Rc<u32>> = RbSet::new();
    let shared = Rc::new(0);

    set.insert(shared.clone());
    for key in 1..100 {
        set.insert(Rc::new(key));
    }

    assert_eq!(Rc::strong_count(&shared), 2);
    drop(set);
    assert_eq!(Rc::strong_count(&shared), 1);
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn merge_equivalence(
        left in proptest::collection::vec(0u32..500, 0..200),
        right in proptest::collection::vec(0u32..500, 0..200),
        split_at in 0u32..500,
    ) {
        model::run_merge_equivalence(model::MergeInput { left, right, split_at });
    }
}
