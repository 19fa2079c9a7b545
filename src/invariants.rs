use core::ptr::NonNull;

use thiserror::Error;

use crate::{Color, Dir, Links, RbTree, TreeNode};

/// A violated red-black tree invariant, as reported by [`RbTree::check_invariants`].
///
/// Keys are rendered with their `Debug` implementation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("the root is red")]
    RedRoot,

    #[error("the root {key} has a parent link or a side tag")]
    RootLinked { key: String },

    #[error("red node {key} has a red child")]
    RedRed { key: String },

    #[error("paths below {key} disagree on black height: {left} on the left, {right} on the right")]
    UnbalancedBlackHeight { key: String, left: u32, right: u32 },

    #[error("node {key} caches black height {cached}, but its subtree has black height {actual}")]
    StaleBlackHeight { key: String, cached: u32, actual: u32 },

    #[error("node {key} caches size {cached}, but its subtree holds {actual} nodes")]
    StaleSize {
        key: String,
        cached: usize,
        actual: usize,
    },

    #[error("node {key} does not point back at its parent")]
    BrokenParentLink { key: String },

    #[error("node {key} is tagged {tagged:?}, but occupies {actual:?}")]
    WrongSide {
        key: String,
        tagged: Option<Dir>,
        actual: Dir,
    },

    #[error("keys out of order: {left} is not less than {right}")]
    OutOfOrder { left: String, right: String },

    #[error("the tree reports {len} elements, but holds {actual}")]
    LengthMismatch { len: usize, actual: usize },
}

impl<T> RbTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Checks every red-black invariant, along with the cached black heights, sizes and parent
    /// links.
    ///
    /// This walks the whole tree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let actual = match self.root {
            Some(root) => unsafe {
                let links = Self::links(root);

                if links.color() == Color::Red {
                    return Err(InvariantError::RedRoot);
                }

                if links.parent().is_some() || links.side().is_some() {
                    return Err(InvariantError::RootLinked {
                        key: Self::key_string(root),
                    });
                }

                self.check_invariants_at(root)?.1
            },
            None => 0,
        };

        if actual != self.len {
            return Err(InvariantError::LengthMismatch {
                len: self.len,
                actual,
            });
        }

        let mut keys = self.iter().map(|node| node.key());
        if let Some(mut prev) = keys.next() {
            for key in keys {
                if prev >= key {
                    return Err(InvariantError::OutOfOrder {
                        left: format!("{prev:?}"),
                        right: format!("{key:?}"),
                    });
                }

                prev = key;
            }
        }

        Ok(())
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        if let Err(error) = self.check_invariants() {
            panic!("red-black invariant violated: {error}");
        }
    }

    // Returns the recomputed black height and size of the subtree rooted at `node`.
    #[allow(clippy::only_used_in_recursion)]
    unsafe fn check_invariants_at(&self, node: NonNull<T>) -> Result<(u32, usize), InvariantError> {
        unsafe {
            let links = Self::links(node);
            let red = links.color() == Color::Red;

            let mut heights = [1; 2];
            let mut size = 1;

            for dir in [Dir::Left, Dir::Right] {
                let Some(child) = links.child(dir) else {
                    continue;
                };

                let child_links = Self::links(child);

                if child_links.parent() != Some(node) {
                    return Err(InvariantError::BrokenParentLink {
                        key: Self::key_string(child),
                    });
                }

                if child_links.side() != Some(dir) {
                    return Err(InvariantError::WrongSide {
                        key: Self::key_string(child),
                        tagged: child_links.side(),
                        actual: dir,
                    });
                }

                if red && child_links.color() == Color::Red {
                    return Err(InvariantError::RedRed {
                        key: Self::key_string(node),
                    });
                }

                let (height, child_size) = self.check_invariants_at(child)?;
                heights[dir as usize] = height;
                size += child_size;
            }

            let [left, right] = heights;
            if left != right {
                return Err(InvariantError::UnbalancedBlackHeight {
                    key: Self::key_string(node),
                    left,
                    right,
                });
            }

            let actual = left + u32::from(!red);
            if links.black_height() != actual {
                return Err(InvariantError::StaleBlackHeight {
                    key: Self::key_string(node),
                    cached: links.black_height(),
                    actual,
                });
            }

            if links.size() != size {
                return Err(InvariantError::StaleSize {
                    key: Self::key_string(node),
                    cached: links.size(),
                    actual: size,
                });
            }

            Ok((actual, size))
        }
    }

    unsafe fn key_string(node: NonNull<T>) -> String {
        unsafe { format!("{:?}", node.as_ref().key()) }
    }
}
