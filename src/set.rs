use core::{borrow::Borrow, fmt, marker::PhantomPinned, ptr::NonNull};

use cordyceps::Linked;

use crate::{InvariantError, Iter, Links, RbTree, Snapshot, Tracer, TreeNode};

/// An ordered set based on a red-black tree.
///
/// Unlike [`RbTree`], the set allocates its own nodes, so it can be used with plain keys.
pub struct RbSet<K: Ord + fmt::Debug> {
    tree: RbTree<SetNode<K>>,
}

struct SetNode<K> {
    links: Links<SetNode<K>>,
    key: K,
    _unpin: PhantomPinned,
}

impl<K> SetNode<K> {
    fn new(key: K) -> Box<Self> {
        Box::new(SetNode {
            links: Links::new(),
            key,
            _unpin: PhantomPinned,
        })
    }
}

unsafe impl<K> Linked<Links<SetNode<K>>> for SetNode<K> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<SetNode<K>>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord + fmt::Debug> TreeNode<Links<SetNode<K>>> for SetNode<K> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

impl<K: Ord + fmt::Debug> RbSet<K> {
    /// Creates a new, empty `RbSet`.
    pub const fn new() -> Self {
        Self {
            tree: RbTree::new(),
        }
    }

    /// Returns `true` if the set contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the set.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the black height of the underlying tree.
    pub fn black_height(&self) -> u32 {
        self.tree.black_height()
    }

    /// Adds `key` to the set.
    ///
    /// Returns `false`, leaving the set unchanged, if an equal key is already present.
    pub fn insert(&mut self, key: K) -> bool {
        self.tree.insert(SetNode::new(key)).is_none()
    }

    /// Removes `key` from the set. Returns `false` if it was not present.
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).is_some()
    }

    /// Returns `true` if the set contains `key`.
    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Looks up `key`. Equivalent to [`contains`](Self::contains).
    #[inline]
    pub fn find<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.contains(key)
    }

    /// Returns a reference to the key in the set equal to `key`, if any.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(|node| &node.get_ref().key)
    }

    /// Returns the minimum key in the set.
    #[inline]
    pub fn first(&self) -> Option<&K> {
        self.tree.first().map(|node| &node.get_ref().key)
    }

    /// Returns the maximum key in the set.
    #[inline]
    pub fn last(&self) -> Option<&K> {
        self.tree.last().map(|node| &node.get_ref().key)
    }

    /// Removes and returns the minimum key in the set.
    #[inline]
    pub fn pop_first(&mut self) -> Option<K> {
        self.tree.pop_first().map(|node| node.key)
    }

    /// Removes and returns the maximum key in the set.
    #[inline]
    pub fn pop_last(&mut self) -> Option<K> {
        self.tree.pop_last().map(|node| node.key)
    }

    /// Returns an iterator over the keys of the set, in ascending order.
    pub fn iter(&self) -> SetIter<'_, K> {
        SetIter {
            inner: self.tree.iter(),
        }
    }

    /// Splits the set around `key`, returning the keys less than it and the keys greater than it.
    ///
    /// `key` itself, if present, ends up in neither half.
    pub fn split<Q>(self, key: &Q) -> (Self, Self)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let split = self.tree.split(key);
        (RbSet { tree: split.less }, RbSet { tree: split.greater })
    }

    /// Moves every key of `other` to the end of `self`.
    ///
    /// Every key in `self` must be less than every key in `other`. This is not checked; if it does
    /// not hold, the set is left in an unspecified (but memory-safe) order.
    pub fn join(&mut self, other: Self) {
        self.tree.join(other.tree);
    }

    /// Moves every key of `other` into `self`, producing the union of both sets.
    pub fn merge(&mut self, other: Self) {
        self.tree.merge(other.tree);
    }

    /// Clears the set, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns an owned copy of the structure of the underlying tree.
    pub fn snapshot(&self) -> Snapshot {
        self.tree.snapshot()
    }

    /// Installs a tracer, which is notified after every structural mutation.
    pub fn set_tracer<R>(&mut self, tracer: R) -> Option<Box<dyn Tracer>>
    where
        R: Tracer + 'static,
    {
        self.tree.set_tracer(tracer)
    }

    /// Removes and returns the installed tracer.
    pub fn take_tracer(&mut self) -> Option<Box<dyn Tracer>> {
        self.tree.take_tracer()
    }

    /// Checks the invariants of the underlying tree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.tree.check_invariants()
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }
}

/// An iterator over the keys of an [`RbSet`], in ascending order.
pub struct SetIter<'set, K: Ord + fmt::Debug> {
    inner: Iter<'set, SetNode<K>>,
}

impl<'set, K: Ord + fmt::Debug> Iterator for SetIter<'set, K> {
    type Item = &'set K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| &node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord + fmt::Debug> ExactSizeIterator for SetIter<'_, K> {}

impl<'set, K: Ord + fmt::Debug> IntoIterator for &'set RbSet<K> {
    type Item = &'set K;
    type IntoIter = SetIter<'set, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Ord + fmt::Debug> Default for RbSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug + Clone> Clone for RbSet<K> {
    fn clone(&self) -> Self {
        self.iter().cloned().collect()
    }
}

impl<K: Ord + fmt::Debug> fmt::Debug for RbSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Ord + fmt::Debug> PartialEq for RbSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Ord + fmt::Debug> Eq for RbSet<K> {}

impl<K: Ord + fmt::Debug> Extend<K> for RbSet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord + fmt::Debug> FromIterator<K> for RbSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = RbSet::new();
        set.extend(iter);
        set
    }
}
