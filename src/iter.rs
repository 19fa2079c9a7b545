use core::iter::FusedIterator;

use crate::{Dir, Link, Links, RbTree, TreeNode};

enum CameFrom {
    Parent,
    LeftChild,
    Here,
    RightChild,
}

/// An in-order iterator over the elements of an [`RbTree`].
pub struct Iter<'tree, T: TreeNode<Links<T>> + ?Sized> {
    front_cur: Link<T>,
    front_from: CameFrom,

    len: usize,

    _tree: &'tree RbTree<T>,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree RbTree<T>) -> Self {
        Iter {
            front_cur: tree.root,
            front_from: CameFrom::Parent,
            len: tree.len(),

            _tree: tree,
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let mut cur = self.front_cur?;

        loop {
            match self.front_from {
                CameFrom::Parent => {
                    // Upon entering a new subtree, find the minimum element.
                    while let Some(left) = unsafe { RbTree::<T>::links(cur).left() } {
                        cur = left;
                    }

                    // Once the minimum is found, its (empty) left subtree has been exhausted.
                    self.front_from = CameFrom::LeftChild;
                }

                CameFrom::LeftChild => {
                    // The left subtree has been exhausted, so this node is up next. Save off the
                    // iterator state and return it.
                    self.front_cur = Some(cur);
                    self.front_from = CameFrom::Here;
                    self.len -= 1;

                    return Some(unsafe { cur.as_ref() });
                }

                CameFrom::Here => {
                    let links = unsafe { RbTree::<T>::links(cur) };

                    if let Some(right) = links.right() {
                        // If the right subtree is not empty, go there.
                        self.front_from = CameFrom::Parent;

                        cur = right;
                    } else if let Some(parent) = links.parent() {
                        // Otherwise, ascend one level.
                        self.front_from = match links.side() {
                            Some(Dir::Left) => CameFrom::LeftChild,
                            _ => CameFrom::RightChild,
                        };

                        cur = parent;
                    } else {
                        unreachable!()
                    }
                }

                CameFrom::RightChild => {
                    // Ascend until we find the successor element.
                    loop {
                        let links = unsafe { RbTree::<T>::links(cur) };

                        match (links.parent(), links.side()) {
                            (Some(parent), Some(Dir::Right)) => cur = parent,
                            (Some(parent), _) => {
                                cur = parent;
                                break;
                            }
                            (None, _) => unreachable!(),
                        }
                    }

                    self.front_cur = Some(cur);
                    self.front_from = CameFrom::LeftChild;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Iter<'_, T> {}

impl<T: TreeNode<Links<T>> + ?Sized> FusedIterator for Iter<'_, T> {}

impl<T> RbTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns an iterator over the elements of the tree, in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }
}

impl<'tree, T> IntoIterator for &'tree RbTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
