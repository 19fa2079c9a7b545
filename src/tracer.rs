use std::{cell::RefCell, ptr::NonNull, rc::Rc};

use crate::{Color, Dir, Link, Links, RbTree, TreeNode};

/// The kind of structural mutation a [`Tracer`] is notified about.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mutation {
    Insert,
    Remove,
    Join,
    Split,
    Merge,
}

/// Receives a snapshot of a tree after each structural mutation.
///
/// A tracer is purely an observer: the tree neither depends on it being installed nor on anything
/// it does with the snapshots.
pub trait Tracer {
    fn on_mutation(&mut self, mutation: Mutation, snapshot: &Snapshot);
}

// Lets the caller keep a handle to a tracer after installing it.
impl<R> Tracer for Rc<RefCell<R>>
where
    R: Tracer + ?Sized,
{
    fn on_mutation(&mut self, mutation: Mutation, snapshot: &Snapshot) {
        self.borrow_mut().on_mutation(mutation, snapshot)
    }
}

/// An owned copy of a tree's structure.
///
/// Nodes are stored in pre-order, so the root (if any) is at index 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    nodes: Vec<SnapshotNode>,
}

/// A single node of a [`Snapshot`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotNode {
    /// The node's key, formatted with [`Debug`].
    pub key: String,
    pub color: Color,
    pub black_height: u32,
    /// The child slot the node occupies in its parent; `None` for the root.
    pub side: Option<Dir>,
    /// Index of the left child in the snapshot.
    pub left: Option<usize>,
    /// Index of the right child in the snapshot.
    pub right: Option<usize>,
}

impl Snapshot {
    /// Returns the root node, or `None` if the tree was empty.
    pub fn root(&self) -> Option<&SnapshotNode> {
        self.nodes.first()
    }

    /// Returns the node at `index`.
    pub fn get(&self, index: usize) -> Option<&SnapshotNode> {
        self.nodes.get(index)
    }

    /// Returns all nodes in pre-order.
    pub fn nodes(&self) -> &[SnapshotNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the keys in in-order.
    pub fn keys_in_order(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(self.nodes.len());
        let mut stack = Vec::new();
        let mut cur = self.root().map(|_| 0);

        while cur.is_some() || !stack.is_empty() {
            while let Some(idx) = cur {
                stack.push(idx);
                cur = self.nodes[idx].left;
            }

            if let Some(idx) = stack.pop() {
                keys.push(self.nodes[idx].key.as_str());
                cur = self.nodes[idx].right;
            }
        }

        keys
    }
}

impl<T> RbTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns an owned copy of the tree's structure.
    ///
    /// This walks the whole tree and does not modify it.
    pub fn snapshot(&self) -> Snapshot {
        let mut nodes = Vec::with_capacity(self.len());

        // Pending nodes, along with the slot in their parent that must receive their index.
        let mut stack: Vec<(NonNull<T>, Option<(usize, Dir)>)> = Vec::new();
        stack.extend(self.root.map(|root| (root, None)));

        while let Some((node, parent_slot)) = stack.pop() {
            let idx = nodes.len();

            if let Some((parent, dir)) = parent_slot {
                let parent: &mut SnapshotNode = &mut nodes[parent];
                match dir {
                    Dir::Left => parent.left = Some(idx),
                    Dir::Right => parent.right = Some(idx),
                }
            }

            unsafe {
                let links = Self::links(node);

                nodes.push(SnapshotNode {
                    key: format!("{:?}", node.as_ref().key()),
                    color: links.color(),
                    black_height: links.black_height(),
                    side: links.side(),
                    left: None,
                    right: None,
                });

                // Push the right child first so the left subtree is recorded first.
                let children: [(Link<T>, Dir); 2] =
                    [(links.right(), Dir::Right), (links.left(), Dir::Left)];
                for (child, dir) in children {
                    if let Some(child) = child {
                        stack.push((child, Some((idx, dir))));
                    }
                }
            }
        }

        Snapshot { nodes }
    }
}
