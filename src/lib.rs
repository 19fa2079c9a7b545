//! An intrusive red-black tree with join-based set operations.
//!
//! Besides the usual ordered-set operations, the tree supports `join`, `split` and `merge` as
//! described by Blelloch, Ferizovic and Sun in [Just Join for Parallel Ordered Sets]. Each node
//! caches its black height, so joining two trees costs time proportional to the difference of
//! their black heights rather than to their sizes.
//!
//! [Just Join for Parallel Ordered Sets]: https://arxiv.org/abs/1602.02120

// Conventions used in comments:
// - The black height of a node `x` is denoted `bh(x)`. It counts the black nodes on any path from
//   `x` down to a missing child, including `x` itself if it is black and the missing child. A
//   missing child thus has black height 1, as does a red leaf.
// - The parent of a node `x` is denoted `p(x)`.
//
// The invariants of a red-black tree are:
// 1. Missing children are black.
// 2. No red node has a red child.
// 3. All paths from a node down to a missing child contain the same number of black nodes.
// 4. The root is black.
//
// Corollary: a node with a single child has a red child, and that child is a leaf.

use core::{
    cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not, pin::Pin,
    ptr::NonNull,
};
use std::borrow::Borrow;

use cordyceps::Linked;
use log::trace;

mod dot;
mod invariants;
mod iter;
mod join;
mod set;
mod tracer;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use dot::DotTracer;
pub use invariants::InvariantError;
pub use iter::Iter;
pub use join::Split;
pub use set::{RbSet, SetIter};
pub use tracer::{Mutation, Snapshot, SnapshotNode, Tracer};

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// An intrusive red-black tree.
///
/// Nodes embed a [`Links`] value and are handed to the tree through their [`Linked::Handle`]. The
/// tree owns every node linked into it; removal hands the node back to the caller.
pub struct RbTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
    tracer: Option<Box<dyn Tracer>>,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

/// A child slot of a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Black,
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    side: Option<Dir>,
    color: Color,
    black_height: u32,
    size: usize,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

// A position that is one black node short after a removal.
enum Slot<T: ?Sized> {
    Present(NonNull<T>),
    // An empty child slot. It is black and has black height 1.
    Missing { parent: NonNull<T>, dir: Dir },
}

impl<T> RbTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> RbTree<T> {
        RbTree {
            root: None,
            len: 0,
            tracer: None,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the black height of the tree, counting the missing children below the leaves.
    ///
    /// An empty tree has black height 1.
    pub fn black_height(&self) -> u32 {
        unsafe { Self::height_of(self.root) }
    }

    /// Installs a tracer, which is notified after every structural mutation.
    ///
    /// Returns the previously installed tracer, if any.
    pub fn set_tracer<R>(&mut self, tracer: R) -> Option<Box<dyn Tracer>>
    where
        R: Tracer + 'static,
    {
        self.tracer.replace(Box::new(tracer))
    }

    /// Removes and returns the installed tracer.
    pub fn take_tracer(&mut self) -> Option<Box<dyn Tracer>> {
        self.tracer.take()
    }

    pub(crate) fn trace(&mut self, mutation: Mutation) {
        if self.tracer.is_none() {
            return;
        }

        let snapshot = self.snapshot();
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.on_mutation(mutation, &snapshot);
        }
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns `true` if the tree contains a node corresponding to `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = Self::links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = Self::links(cur).right(),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        let first = self.extreme(Dir::Left)?;
        unsafe { Some(Pin::new_unchecked(first.as_ref())) }
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        let last = self.extreme(Dir::Right)?;
        unsafe { Some(Pin::new_unchecked(last.as_ref())) }
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = self.extreme(Dir::Left)?;
        unsafe { Some(self.remove_at(first)) }
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = self.extreme(Dir::Right)?;
        unsafe { Some(self.remove_at(last)) }
    }

    // Follows `dir` links from the root as far as they go.
    fn extreme(&self, dir: Dir) -> Link<T> {
        let mut cur = self.root?;

        while let Some(next) = unsafe { Self::links(cur).child(dir) } {
            cur = next;
        }

        Some(cur)
    }

    // Makes `child` the `dir` child of `parent` and points its back-references at `parent`.
    //
    // The node previously in that slot, if any, still believes `parent` is its parent.
    #[inline]
    unsafe fn attach(parent: NonNull<T>, dir: Dir, child: Link<T>) {
        unsafe {
            Self::links_mut(parent).set_child(dir, child);

            if let Some(child) = child {
                let links = Self::links_mut(child);
                links.set_parent(Some(parent));
                links.set_side(Some(dir));
            }
        }
    }

    // Unlinks the `dir` child of `node` and returns it as the root of a standalone subtree.
    #[inline]
    unsafe fn detach(node: NonNull<T>, dir: Dir) -> Link<T> {
        unsafe {
            let child = Self::links_mut(node).set_child(dir, None);

            if let Some(child) = child {
                Self::make_root(child);
            }

            child
        }
    }

    #[inline]
    unsafe fn make_root(node: NonNull<T>) {
        unsafe {
            let links = Self::links_mut(node);
            links.set_parent(None);
            links.set_side(None);
        }
    }

    // Puts `new` wherever `old` currently hangs: in its parent's child slot, or at the root.
    unsafe fn replace_in_parent(&mut self, old: NonNull<T>, new: Link<T>) {
        unsafe {
            let links = Self::links(old);

            match (links.parent(), links.side()) {
                (Some(parent), Some(dir)) => Self::attach(parent, dir, new),
                _ => {
                    self.root = new;
                    if let Some(new) = new {
                        Self::make_root(new);
                    }
                }
            }
        }
    }

    // Rotates the subtree rooted at `node` towards `dir`: the `!dir` child of `node` moves up into
    // `node`'s position, and its `dir` child is handed over to `node`.
    //
    // Returns the node now occupying `node`'s position. If `node` has no `!dir` child, nothing
    // changes and `node` itself is returned. The tree root is not updated; see `rotate`.
    unsafe fn rotate_subtree(node: NonNull<T>, dir: Dir) -> NonNull<T> {
        unsafe {
            let Some(up) = Self::links(node).child(!dir) else {
                return node;
            };

            let parent = Self::links(node).parent();
            let side = Self::links(node).side();

            let across = Self::links(up).child(dir);
            Self::attach(node, !dir, across);
            Self::attach(up, dir, Some(node));

            match (parent, side) {
                (Some(parent), Some(side)) => Self::attach(parent, side, Some(up)),
                _ => Self::make_root(up),
            }

            Self::update(node);
            Self::update(up);

            up
        }
    }

    // Performs a rotation at `node` and moves the tree root along with it.
    fn rotate(&mut self, node: NonNull<T>, dir: Dir) -> NonNull<T> {
        let up = unsafe { Self::rotate_subtree(node, dir) };

        if self.root == Some(node) {
            self.root = Some(up);
        }

        up
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already contains an item with an equal key, the tree is left unchanged and
    /// `item` is handed back.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        unsafe {
            Self::links_mut(ptr).reset();

            let Some(mut parent) = self.root else {
                self.root = Some(ptr);
                self.rebalance_inserted(ptr);
                self.len += 1;
                self.trace(Mutation::Insert);
                return None;
            };

            // Descend the tree, looking for an empty slot.
            let dir = loop {
                let dir = match ptr.as_ref().key().cmp(parent.as_ref().key()) {
                    Ordering::Less => Dir::Left,
                    Ordering::Equal => return Some(T::from_ptr(ptr)),
                    Ordering::Greater => Dir::Right,
                };

                match Self::links(parent).child(dir) {
                    Some(child) => parent = child,
                    None => break dir,
                }
            };

            Self::attach(parent, dir, Some(ptr));

            let mut opt_ancestor = Some(parent);
            while let Some(ancestor) = opt_ancestor {
                let links = Self::links_mut(ancestor);
                links.set_size(links.size() + 1);
                opt_ancestor = links.parent();
            }

            trace!("insert {:?} below {:?}", ptr.as_ref().key(), parent.as_ref().key());
        }

        self.rebalance_inserted(ptr);
        self.len += 1;
        self.trace(Mutation::Insert);

        None
    }

    // Restores the red-black invariants after `node` was linked in as a red leaf.
    fn rebalance_inserted(&mut self, node: NonNull<T>) {
        let mut x = node;

        unsafe {
            // While `x` and its parent are both red, invariant 2 is violated.
            while let Some(parent) = Self::links(x).parent().filter(|&p| Self::is_red(Some(p))) {
                let grandparent = Self::links(parent)
                    .parent()
                    .expect("red node must not be the tree root");

                let parent_dir = Self::side_of(parent);
                let uncle = Self::links(grandparent).child(!parent_dir);

                if let Some(uncle) = uncle.filter(|&u| Self::is_red(Some(u))) {
                    // Push the red up one level and retry from the grandparent.
                    Self::paint(parent, Color::Black);
                    Self::paint(uncle, Color::Black);
                    Self::paint(grandparent, Color::Red);
                    x = grandparent;
                    continue;
                }

                let mut parent = parent;
                if Self::side_of(x) != parent_dir {
                    // `x` is an inner grandchild. Rotate it into the outer position.
                    self.rotate(parent, parent_dir);
                    parent = x;
                }

                Self::paint(parent, Color::Black);
                Self::paint(grandparent, Color::Red);
                self.rotate(grandparent, !parent_dir);
                break;
            }

            if let Some(root) = self.root.filter(|&r| Self::is_red(Some(r))) {
                Self::paint(root, Color::Black);
            }
        }
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent.
    #[inline]
    unsafe fn min_in_subtree(root: NonNull<T>) -> (NonNull<T>, Option<NonNull<T>>) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = unsafe { Self::links(cur).left() } {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    /// Removes the node corresponding to `key` from the tree and returns it.
    ///
    /// Returns `None` and leaves the tree unchanged if there is no such node.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        unsafe { Some(self.remove_at(node)) }
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        unsafe {
            trace!("remove {:?}", node.as_ref().key());
            self.unlink(node);
            self.trace(Mutation::Remove);

            T::from_ptr(node)
        }
    }

    // Unlinks `node` from the tree and rebalances, without notifying the tracer.
    unsafe fn unlink(&mut self, node: NonNull<T>) {
        // There are three possible cases:
        //
        // 1. `node` has two children.
        //
        //    Its successor[^1] is spliced out of its position, its right child taking its place,
        //    and then takes over `node`'s position, colour and black height. The colour that
        //    leaves the tree is the successor's.
        //
        // 2. `node` has one child.
        //
        //    The child takes `node`'s place.
        //
        // 3. `node` is a leaf.
        //
        //    The slot `node` occupied becomes empty.
        //
        // If the colour that left the tree is black, every path through the vacated position is
        // now one black node short, and the slot at that position is rebalanced.
        //
        // [^1]: The successor of a node `a` is the least node in `a`'s right subtree.

        unsafe {
            let links = Self::links(node);
            let (parent, side) = (links.parent(), links.side());
            let (left, right) = (links.left(), links.right());

            let (removed_color, hole) = match (left, right) {
                (Some(left), Some(right)) => {
                    let (successor, successor_parent) = Self::min_in_subtree(right);
                    let successor_right = Self::links(successor).right();
                    let removed_color = Self::links(successor).color();

                    let hole = match successor_parent {
                        Some(successor_parent) => {
                            // Elevate the successor's right child to replace it.
                            Self::attach(successor_parent, Dir::Left, successor_right);
                            Self::attach(successor, Dir::Right, Some(right));
                            Self::slot(successor_right, successor_parent, Dir::Left)
                        }

                        // The successor is `right` and keeps its right subtree.
                        None => Self::slot(successor_right, successor, Dir::Right),
                    };

                    Self::attach(successor, Dir::Left, Some(left));
                    self.replace_in_parent(node, Some(successor));

                    let node_color = links.color();
                    let node_height = links.black_height();
                    let successor_links = Self::links_mut(successor);
                    successor_links.set_color(node_color);
                    successor_links.set_black_height(node_height);

                    (removed_color, Some(hole))
                }

                (Some(child), None) | (None, Some(child)) => {
                    self.replace_in_parent(node, Some(child));
                    (links.color(), Some(Slot::Present(child)))
                }

                (None, None) => {
                    self.replace_in_parent(node, None);

                    let hole = match (parent, side) {
                        (Some(parent), Some(dir)) => Some(Slot::Missing { parent, dir }),
                        _ => None,
                    };

                    (links.color(), hole)
                }
            };

            if let Some(hole) = &hole {
                let mut opt_ancestor = hole.parent();
                while let Some(ancestor) = opt_ancestor {
                    Self::update_size(ancestor);
                    opt_ancestor = Self::links(ancestor).parent();
                }
            }

            if removed_color == Color::Black {
                if let Some(hole) = hole {
                    self.rebalance_removed(hole);
                }
            }

            Self::links_mut(node).reset();
            self.len -= 1;
        }
    }

    unsafe fn slot(node: Link<T>, parent: NonNull<T>, dir: Dir) -> Slot<T> {
        match node {
            Some(node) => Slot::Present(node),
            None => Slot::Missing { parent, dir },
        }
    }

    // Restores the red-black invariants when every path through `x` is one black node short.
    unsafe fn rebalance_removed(&mut self, mut x: Slot<T>) {
        unsafe {
            while let (Some(parent), Some(dir)) = (x.parent(), x.dir()) {
                if x.color() == Color::Red {
                    break;
                }

                let mut sibling = Self::links(parent)
                    .child(!dir)
                    .expect("short slot must have a sibling");

                if Self::is_red(Some(sibling)) {
                    // Rotate the red sibling above the parent, so the new sibling is black.
                    Self::paint(sibling, Color::Black);
                    Self::paint(parent, Color::Red);
                    self.rotate(parent, dir);
                    sibling = Self::links(parent)
                        .child(!dir)
                        .expect("short slot must have a sibling");
                }

                let near = Self::links(sibling).child(dir);
                let far = Self::links(sibling).child(!dir);

                if !Self::is_red(near) && !Self::is_red(far) {
                    // Shorten the sibling's side too and move the deficiency up to the parent.
                    Self::paint(sibling, Color::Red);
                    Self::update(parent);
                    x = Slot::Present(parent);
                    continue;
                }

                if let Some(near) = near.filter(|_| !Self::is_red(far)) {
                    Self::paint(near, Color::Black);
                    Self::paint(sibling, Color::Red);
                    sibling = self.rotate(sibling, !dir);
                }

                Self::paint(sibling, Self::links(parent).color());
                Self::paint(parent, Color::Black);
                if let Some(far) = Self::links(sibling).child(!dir) {
                    Self::paint(far, Color::Black);
                }
                self.rotate(parent, dir);
                return;
            }

            if let Slot::Present(node) = x {
                if Self::is_red(Some(node)) {
                    Self::paint(node, Color::Black);
                }
            }
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let (cur, parent) = Self::min_in_subtree(cur);
                let parent = parent.or_else(|| Self::links(cur).parent());

                let right = Self::links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_in_parent(cur, right);

                // Drop the node.
                Self::links_mut(cur).reset();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Replaces the contents of the tree with the subtree rooted at `root`.
    //
    // The root is painted black, and the length is taken from its cached size.
    pub(crate) fn set_root(&mut self, root: Link<T>) {
        unsafe {
            if let Some(root) = root {
                Self::make_root(root);

                if Self::is_red(Some(root)) {
                    Self::paint(root, Color::Black);
                }
            }

            self.root = root;
            self.len = Self::size_of(root);
        }
    }

    // Support methods ========================================================

    #[inline]
    unsafe fn links<'a>(node: NonNull<T>) -> &'a Links<T> {
        unsafe { T::links(node).as_ref() }
    }

    #[inline]
    unsafe fn links_mut<'a>(node: NonNull<T>) -> &'a mut Links<T> {
        unsafe { T::links(node).as_mut() }
    }

    #[inline]
    unsafe fn is_red(node: Link<T>) -> bool {
        node.map(|n| unsafe { Self::links(n).color() } == Color::Red)
            .unwrap_or(false)
    }

    /// Returns the black height of the pointed-to node.
    #[inline]
    unsafe fn height_of(node: Link<T>) -> u32 {
        node.map(|n| unsafe { Self::links(n).black_height() })
            .unwrap_or(1)
    }

    #[inline]
    unsafe fn size_of(node: Link<T>) -> usize {
        node.map(|n| unsafe { Self::links(n).size() }).unwrap_or(0)
    }

    unsafe fn side_of(node: NonNull<T>) -> Dir {
        unsafe {
            Self::links(node)
                .side()
                .expect("non-root node must occupy a side of its parent")
        }
    }

    // Recolors `node`, keeping its cached black height in step.
    #[inline]
    unsafe fn paint(node: NonNull<T>, color: Color) {
        unsafe {
            Self::links_mut(node).set_color(color);
            Self::update(node);
        }
    }

    #[inline]
    unsafe fn blacken(node: Link<T>) {
        if let Some(node) = node {
            unsafe { Self::paint(node, Color::Black) };
        }
    }

    // Recomputes the cached black height and size of `node` from its children.
    //
    // While a removal is being rebalanced, the short child of a node is one black node lower than
    // its sibling. The taller child gives the height the node must be restored to, so it is the
    // one that counts.
    unsafe fn update(node: NonNull<T>) {
        unsafe {
            let links = Self::links(node);
            let (left, right) = (links.left(), links.right());

            let below = Self::height_of(left).max(Self::height_of(right));
            let own = u32::from(links.color() == Color::Black);

            let links = Self::links_mut(node);
            links.set_black_height(below + own);
            links.set_size(1 + Self::size_of(left) + Self::size_of(right));
        }
    }

    #[inline]
    unsafe fn update_size(node: NonNull<T>) {
        unsafe {
            let links = Self::links(node);
            let size = 1 + Self::size_of(links.left()) + Self::size_of(links.right());
            Self::links_mut(node).set_size(size);
        }
    }
}

impl<T> Default for RbTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RbTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|node| node.key()))
            .finish()
    }
}

impl<T> Drop for RbTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized> Slot<T> {
    fn parent(&self) -> Link<T>
    where
        T: TreeNode<Links<T>>,
    {
        match *self {
            Slot::Present(node) => unsafe { T::links(node).as_ref().parent() },
            Slot::Missing { parent, .. } => Some(parent),
        }
    }

    fn dir(&self) -> Option<Dir>
    where
        T: TreeNode<Links<T>>,
    {
        match *self {
            Slot::Present(node) => unsafe { T::links(node).as_ref().side() },
            Slot::Missing { dir, .. } => Some(dir),
        }
    }

    fn color(&self) -> Color
    where
        T: TreeNode<Links<T>>,
    {
        match *self {
            Slot::Present(node) => unsafe { T::links(node).as_ref().color() },
            Slot::Missing { .. } => Color::Black,
        }
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                side: None,
                color: Color::Red,
                black_height: 1,
                size: 1,
                _unpin: PhantomPinned,
            }),
        }
    }

    // Returns the links to the state of a freshly inserted red leaf.
    #[inline]
    fn reset(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.side = None;
        inner.color = Color::Red;
        inner.black_height = 1;
        inner.size = 1;
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn side(&self) -> Option<Dir> {
        unsafe { (*self.inner.get()).side }
    }

    #[inline]
    fn color(&self) -> Color {
        unsafe { (*self.inner.get()).color }
    }

    #[inline]
    fn black_height(&self) -> u32 {
        unsafe { (*self.inner.get()).black_height }
    }

    #[inline]
    fn size(&self) -> usize {
        unsafe { (*self.inner.get()).size }
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_side(&mut self, side: Option<Dir>) {
        self.inner.get_mut().side = side;
    }

    #[inline]
    fn set_color(&mut self, color: Color) {
        self.inner.get_mut().color = color;
    }

    #[inline]
    fn set_black_height(&mut self, black_height: u32) {
        self.inner.get_mut().black_height = black_height;
    }

    #[inline]
    fn set_size(&mut self, size: usize) {
        self.inner.get_mut().size = size;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("side", &self.side())
            .field("color", &self.color())
            .field("black_height", &self.black_height())
            .field("size", &self.size())
            .finish()
    }
}
