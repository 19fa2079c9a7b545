//! Join-based bulk operations.
//!
//! `join` is the primitive: given two valid subtrees and a pivot whose key lies between them, it
//! descends the spine of the taller subtree until it meets a black node as tall as the shorter
//! subtree, hangs a red pivot there and fixes any red-red pair on the way back up with at most
//! one rotation per level. `split` and `merge` are built from it.

use core::{borrow::Borrow, cmp::Ordering, ptr::NonNull};

use log::debug;

use crate::{Color, Dir, Link, Links, Mutation, RbTree, TreeNode};

/// The result of splitting a tree around a key.
pub struct Split<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Every element less than the key.
    pub less: RbTree<T>,
    /// The element equal to the key, if the tree contained one. It belongs to neither half.
    pub found: Option<T::Handle>,
    /// Every element greater than the key.
    pub greater: RbTree<T>,
}

// Loose subtrees produced while splitting. Roots may be red.
struct Parts<T: ?Sized> {
    less: Link<T>,
    found: Link<T>,
    greater: Link<T>,
}

impl<T: ?Sized> Parts<T> {
    fn empty() -> Self {
        Parts {
            less: None,
            found: None,
            greater: None,
        }
    }
}

impl<T> RbTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Moves every element of `other` to the end of `self`.
    ///
    /// Every key in `self` must be less than every key in `other`. This is not checked; if it does
    /// not hold, the resulting tree is not ordered.
    ///
    /// The first element of `other` is used as the pivot. This operation completes in
    /// _O(log(n))_ time.
    pub fn join(&mut self, mut other: RbTree<T>) {
        let Some(pivot) = other.extreme(Dir::Left) else {
            self.trace(Mutation::Join);
            return;
        };

        unsafe {
            other.unlink(pivot);
            self.join_around(T::from_ptr(pivot), other);
        }
    }

    /// Joins `self`, `pivot` and `other` into a single tree, stored in `self`.
    ///
    /// Every key in `self` must be less than the pivot's key, which must be less than every key
    /// in `other`. This is not checked; if it does not hold, the resulting tree is not ordered.
    ///
    /// This operation completes in time proportional to the difference of the two trees' black
    /// heights.
    pub fn join_around(&mut self, pivot: T::Handle, mut other: RbTree<T>) {
        let pivot = T::into_ptr(pivot);
        let left = self.root.take();
        let right = other.root.take();
        other.len = 0;

        let root = unsafe { Self::join_at(left, pivot, right) };
        self.set_root(Some(root));

        debug!("join: {} elements, black height {}", self.len, self.black_height());
        self.trace(Mutation::Join);
    }

    /// Splits the tree around `key`.
    ///
    /// The tree is consumed. Elements less than `key` end up in [`Split::less`], elements greater
    /// than `key` in [`Split::greater`], and an element equal to `key` is handed back in
    /// [`Split::found`]. An installed tracer is notified of both halves and then moves to the
    /// `less` half.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn split<Q>(mut self, key: &Q) -> Split<T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let root = self.root.take();
        self.len = 0;
        let tracer = self.tracer.take();

        let parts = unsafe { Self::split_at(root, key) };

        let mut less = RbTree::new();
        less.set_root(parts.less);
        let mut greater = RbTree::new();
        greater.set_root(parts.greater);

        let found = parts.found.map(|node| unsafe {
            Self::links_mut(node).reset();
            T::from_ptr(node)
        });

        debug!(
            "split: {} less, {} greater, found: {}",
            less.len(),
            greater.len(),
            found.is_some()
        );

        if let Some(tracer) = tracer {
            greater.tracer = Some(tracer);
            greater.trace(Mutation::Split);
            less.tracer = greater.tracer.take();
            less.trace(Mutation::Split);
        }

        Split {
            less,
            found,
            greater,
        }
    }

    /// Moves every element of `other` into `self`, producing the union of both trees.
    ///
    /// Where both trees contain equal keys, the element from `other` is kept and the one from
    /// `self` is displaced. The displaced elements are returned.
    ///
    /// For trees of sizes _m ≤ n_ this completes in _O(m log(n/m + 1))_ time.
    pub fn merge(&mut self, mut other: RbTree<T>) -> Vec<T::Handle> {
        let mut displaced = Vec::new();

        let into = self.root.take();
        let from = other.root.take();
        other.len = 0;

        let root = unsafe { Self::merge_at(into, from, &mut displaced) };
        self.set_root(root);

        debug!(
            "merge: {} elements, {} displaced",
            self.len,
            displaced.len()
        );
        self.trace(Mutation::Merge);

        displaced
    }

    // Joins the standalone subtrees `left` and `right` around `pivot` and returns the root of the
    // result, which may be red.
    //
    // Every key in `left` must be less than the pivot's key, and every key in `right` greater.
    unsafe fn join_at(left: Link<T>, pivot: NonNull<T>, right: Link<T>) -> NonNull<T> {
        unsafe {
            Self::links_mut(pivot).reset();

            match Self::height_of(left).cmp(&Self::height_of(right)) {
                Ordering::Greater => {
                    // The shorter subtree ends up below a red node, so its root must be black.
                    Self::blacken(right);

                    let root = Self::join_right(left, pivot, right);
                    if Self::is_red(Some(root)) && Self::is_red(Self::links(root).right()) {
                        Self::paint(root, Color::Black);
                    }

                    root
                }

                Ordering::Less => {
                    Self::blacken(left);

                    let root = Self::join_left(left, pivot, right);
                    if Self::is_red(Some(root)) && Self::is_red(Self::links(root).left()) {
                        Self::paint(root, Color::Black);
                    }

                    root
                }

                Ordering::Equal => {
                    let color = if Self::is_red(left) || Self::is_red(right) {
                        Color::Black
                    } else {
                        Color::Red
                    };

                    Self::attach(pivot, Dir::Left, left);
                    Self::attach(pivot, Dir::Right, right);
                    Self::paint(pivot, color);

                    pivot
                }
            }
        }
    }

    // `left` is at least as tall as `right`, whose root is black.
    #[inline]
    unsafe fn join_right(left: Link<T>, pivot: NonNull<T>, right: Link<T>) -> NonNull<T> {
        unsafe { Self::join_spine(left, pivot, right, Dir::Right) }
    }

    // `right` is at least as tall as `left`, whose root is black.
    #[inline]
    unsafe fn join_left(left: Link<T>, pivot: NonNull<T>, right: Link<T>) -> NonNull<T> {
        unsafe { Self::join_spine(right, pivot, left, Dir::Left) }
    }

    // Walks down the `dir` spine of `tall` to a black node as tall as `short` and hangs the pivot
    // there, with `short` as its `dir` child.
    //
    // Returns the root of the rebuilt `tall` subtree. It may be red with a red `dir` child; every
    // other red-red pair is resolved.
    unsafe fn join_spine(
        tall: Link<T>,
        pivot: NonNull<T>,
        short: Link<T>,
        dir: Dir,
    ) -> NonNull<T> {
        unsafe {
            if !Self::is_red(tall) && Self::height_of(tall) == Self::height_of(short) {
                Self::attach(pivot, !dir, tall);
                Self::attach(pivot, dir, short);
                Self::paint(pivot, Color::Red);
                return pivot;
            }

            // Black heights shrink by at most one per step down the spine, and missing children
            // are black, so a match is found before the spine runs out.
            let node = tall.expect("spine ended above the shorter subtree's height");

            let spine = Self::detach(node, dir);
            let joined = Self::join_spine(spine, pivot, short, dir);
            Self::attach(node, dir, Some(joined));
            Self::update(node);

            if !Self::is_red(Some(node))
                && Self::is_red(Some(joined))
                && Self::is_red(Self::links(joined).child(dir))
            {
                Self::blacken(Self::links(joined).child(dir));
                return Self::rotate_subtree(node, !dir);
            }

            node
        }
    }

    // Splits the standalone subtree rooted at `subroot` around `key`.
    unsafe fn split_at<Q>(subroot: Link<T>, key: &Q) -> Parts<T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let Some(node) = subroot else {
            return Parts::empty();
        };

        unsafe {
            let left = Self::detach(node, Dir::Left);
            let right = Self::detach(node, Dir::Right);

            match key.cmp(node.as_ref().key().borrow()) {
                Ordering::Equal => Parts {
                    less: left,
                    found: Some(node),
                    greater: right,
                },

                Ordering::Less => {
                    let parts = Self::split_at(left, key);
                    Parts {
                        greater: Some(Self::join_at(parts.greater, node, right)),
                        ..parts
                    }
                }

                Ordering::Greater => {
                    let parts = Self::split_at(right, key);
                    Parts {
                        less: Some(Self::join_at(left, node, parts.less)),
                        ..parts
                    }
                }
            }
        }
    }

    // Unions the standalone subtrees `into` and `from`, returning the root of the result.
    //
    // Nodes of `into` whose keys also occur in `from` are pushed to `displaced`.
    unsafe fn merge_at(
        into: Link<T>,
        from: Link<T>,
        displaced: &mut Vec<T::Handle>,
    ) -> Link<T> {
        let Some(into) = into else {
            return from;
        };

        let Some(pivot) = from else {
            return Some(into);
        };

        unsafe {
            let from_left = Self::detach(pivot, Dir::Left);
            let from_right = Self::detach(pivot, Dir::Right);

            let parts = Self::split_at(Some(into), pivot.as_ref().key());

            if let Some(duplicate) = parts.found {
                Self::links_mut(duplicate).reset();
                displaced.push(T::from_ptr(duplicate));
            }

            let left = Self::merge_at(parts.less, from_left, displaced);
            let right = Self::merge_at(parts.greater, from_right, displaced);

            Some(Self::join_at(left, pivot, right))
        }
    }
}
