//! Equivalence checks against [`BTreeSet`], shared by the property tests and the fuzz targets.

use std::{collections::BTreeSet, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{Links, RbTree, TreeNode};

#[derive(Debug)]
#[repr(C)]
pub struct TestNode {
    pub links: Links<TestNode>,
    pub key: u32,
}

impl TestNode {
    pub fn new(key: u32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

/// Builds a tree holding `keys`, skipping duplicates.
pub fn tree_of(keys: impl IntoIterator<Item = u32>) -> RbTree<TestNode> {
    let mut tree = RbTree::new();
    for key in keys {
        tree.insert(TestNode::new(key));
    }
    tree
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Get(ItemValue),
    Remove(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
    /// Split around a value, then put the pieces back together.
    SplitRejoin(ItemValue),
    /// Split around a value and keep only the lesser half.
    SplitOff(ItemValue),
    /// Merge in a second tree holding the given values.
    Merge(Vec<ItemValue>),
}

impl Op {
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_value(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as u32
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(sorted, item)),
            Op::Get(item) => FinalOp::Get(get_value(sorted, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(sorted, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
            Op::SplitRejoin(item) => FinalOp::SplitRejoin(get_value(sorted, item)),
            Op::SplitOff(item) => FinalOp::SplitOff(get_value(sorted, item)),
            Op::Merge(items) => FinalOp::Merge(
                items
                    .into_iter()
                    .map(|item| get_value(sorted, item))
                    .collect(),
            ),
        }
    }
}

#[derive(Clone, Debug)]
enum FinalOp {
    Insert(u32),
    Get(u32),
    Remove(u32),
    First,
    PopFirst,
    Last,
    PopLast,
    SplitRejoin(u32),
    SplitOff(u32),
    Merge(Vec<u32>),
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        4 => value_strategy().prop_map(Op::Insert),
        2 => value_strategy().prop_map(Op::Get),
        3 => value_strategy().prop_map(Op::Remove),
        1 => Just(Op::First),
        1 => Just(Op::PopFirst),
        1 => Just(Op::Last),
        1 => Just(Op::PopLast),
        1 => value_strategy().prop_map(Op::SplitRejoin),
        1 => value_strategy().prop_map(Op::SplitOff),
        1 => proptest::collection::vec(value_strategy(), 0..16).prop_map(Op::Merge),
    ]
}

#[inline]
#[allow(clippy::boxed_local)]
fn node_key(node: Box<TestNode>) -> u32 {
    node.key
}

#[inline]
fn ref_key(node: &TestNode) -> &u32 {
    &node.key
}

pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut btree = BTreeSet::new();
    let mut rb: RbTree<TestNode> = RbTree::new();

    for (op_id, op) in ops.into_iter().enumerate() {
        let sorted_values: Vec<u32> = btree.iter().copied().collect();
        let final_op = op.finalize(&sorted_values);

        match final_op.clone() {
            FinalOp::Insert(value) => {
                let from_btree = if btree.insert(value) {
                    None
                } else {
                    Some(value)
                };
                let from_rb = rb.insert(TestNode::new(value)).map(node_key);

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Get(value) => {
                let from_btree = btree.get(&value);
                let from_rb = rb.get(&value).map(|node| ref_key(node.get_ref()));

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(value) => {
                let from_btree = btree.remove(&value).then_some(value);
                let from_rb = rb.remove(&value).map(node_key);

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_btree = btree.first();
                let from_rb = rb.first().map(|node| ref_key(node.get_ref()));

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_rb = rb.pop_first().map(node_key);

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last();
                let from_rb = rb.last().map(|node| ref_key(node.get_ref()));

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_rb = rb.pop_last().map(node_key);

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::SplitRejoin(value) => {
                let split = rb.split(&value);
                split.less.assert_invariants();
                split.greater.assert_invariants();

                assert_eq!(
                    btree.contains(&value),
                    split.found.is_some(),
                    "FinalOp #{op_id}: {final_op:?}"
                );
                assert_eq!(btree.range(..value).count(), split.less.len());
                assert_eq!(btree.range(value + 1..).count(), split.greater.len());

                let mut less = split.less;
                match split.found {
                    Some(found) => less.join_around(found, split.greater),
                    None => less.join(split.greater),
                }
                rb = less;
            }

            FinalOp::SplitOff(value) => {
                let split = rb.split(&value);
                let from_rb: Vec<u32> = split.greater.iter().map(|node| node.key).collect();

                let greater = btree.split_off(&value);
                let from_btree: Vec<u32> = greater.into_iter().filter(|&k| k != value).collect();

                assert_eq!(from_btree, from_rb, "FinalOp #{op_id}: {final_op:?}");
                rb = split.less;
            }

            FinalOp::Merge(values) => {
                let other_btree: BTreeSet<u32> = values.iter().copied().collect();
                let other = tree_of(values);
                other.assert_invariants();

                let expected_displaced: Vec<u32> =
                    btree.intersection(&other_btree).copied().collect();
                btree.extend(other_btree);

                let mut displaced: Vec<u32> = rb.merge(other).into_iter().map(node_key).collect();
                displaced.sort_unstable();

                assert_eq!(
                    expected_displaced, displaced,
                    "FinalOp #{op_id}: {final_op:?}"
                );
            }
        }

        rb.assert_invariants();
        assert_eq!(btree.len(), rb.len());
        assert!(btree.iter().zip(rb.iter()).all(|(&a, b)| a == b.key));
    }
}

#[derive(Clone, Debug)]
pub struct MergeInput {
    pub left: Vec<u32>,
    pub right: Vec<u32>,
    pub split_at: u32,
}

impl<'a> arbitrary::Arbitrary<'a> for MergeInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn values(u: &mut arbitrary::Unstructured<'_>, max: u16) -> arbitrary::Result<Vec<u32>> {
            let len = u16::arbitrary(u)? % max;
            Ok(core::iter::repeat_with(|| u16::arbitrary(u).map(u32::from).unwrap_or(0))
                .take(len.into())
                .collect())
        }

        Ok(MergeInput {
            left: values(u, 1000)?,
            right: values(u, 1000)?,
            split_at: u16::arbitrary(u).map(u32::from).unwrap_or(0),
        })
    }
}

/// Merges two trees, then splits the union and joins it back together, checking every
/// intermediate tree against a [`BTreeSet`].
pub fn run_merge_equivalence(input: MergeInput) {
    let MergeInput {
        left,
        right,
        split_at,
    } = input;

    let left_btree: BTreeSet<u32> = left.iter().copied().collect();
    let right_btree: BTreeSet<u32> = right.iter().copied().collect();

    let mut rb = tree_of(left);
    let other = tree_of(right);
    rb.assert_invariants();
    other.assert_invariants();

    let mut displaced: Vec<u32> = rb.merge(other).into_iter().map(node_key).collect();
    displaced.sort_unstable();

    let expected: Vec<u32> = left_btree.intersection(&right_btree).copied().collect();
    assert_eq!(expected, displaced);

    let union: BTreeSet<u32> = left_btree.union(&right_btree).copied().collect();
    rb.assert_invariants();
    assert!(union.iter().copied().eq(rb.iter().map(|node| node.key)));

    let split = rb.split(&split_at);
    split.less.assert_invariants();
    split.greater.assert_invariants();
    assert!(union
        .range(..split_at)
        .copied()
        .eq(split.less.iter().map(|node| node.key)));
    assert!(union
        .range(split_at..)
        .copied()
        .filter(|&k| k != split_at)
        .eq(split.greater.iter().map(|node| node.key)));
    assert_eq!(union.contains(&split_at), split.found.is_some());

    let mut rejoined = split.less;
    match split.found {
        Some(found) => rejoined.join_around(found, split.greater),
        None => rejoined.join(split.greater),
    }

    rejoined.assert_invariants();
    assert!(union.iter().copied().eq(rejoined.iter().map(|node| node.key)));
}
