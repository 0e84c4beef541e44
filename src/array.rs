//! Persistent fixed-length sequence with O(log n) reads and writes.
//!
//! The sequence is backed by an immutable binary search tree keyed by
//! index. The tree's shape is picked once, at construction, by inserting
//! the indices in a shuffled order; every later version shares that shape.
//! Writing an element path-copies only the spine from the root down to the
//! index's node, so each version costs O(log n) expected space on top of
//! the ones before it.
//!
//! Versions are an append-only vec of roots. `undo`/`redo` just move the
//! read cursor; a write after `undo` pops the abandoned versions first.

use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::versioned::VersionCursor;
use crate::versioned::Versioned;

/// Error returned by indexed accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayError {
    /// The index is outside `0..len`.
    IndexOutOfBounds,
}

/// One tree node. Nodes are immutable once built and shared between every
/// version that can reach them.
struct Node<T> {
    index: usize,
    value: T,
    left: Option<Rc<Node<T>>>,
    right: Option<Rc<Node<T>>>,
}

type Link<T> = Option<Rc<Node<T>>>;

/// A persistent sequence of fixed length.
///
/// Every write produces a new version; `undo` and `redo` navigate between
/// them. Reads always see the version under the cursor.
pub struct PersistentArray<T> {
    len: usize,
    cursor: VersionCursor,
    /// Roots indexed by version number. `None` only for a zero-length
    /// sequence.
    versions: Vec<Link<T>>,
}

impl<T: Clone + Default> PersistentArray<T> {
    /// Create a sequence of `len` default values, shaped by an
    /// entropy-seeded shuffle.
    pub fn new(len: usize) -> PersistentArray<T> {
        return PersistentArray::build(len, StdRng::from_entropy());
    }

    /// Create a sequence of `len` default values with a deterministic
    /// shape, for reproducible tests.
    pub fn with_seed(len: usize, seed: u64) -> PersistentArray<T> {
        return PersistentArray::build(len, StdRng::seed_from_u64(seed));
    }

    fn build(len: usize, mut rng: StdRng) -> PersistentArray<T> {
        let mut root: Link<T> = None;
        if len > 0 {
            root = Some(Rc::new(Node {
                index: 0,
                value: T::default(),
                left: None,
                right: None,
            }));
            let mut order: Vec<usize> = (1..len).collect();
            order.shuffle(&mut rng);
            for index in order {
                create(&mut root, index);
            }
        }
        return PersistentArray {
            len,
            cursor: VersionCursor::new(),
            versions: vec![root],
        };
    }

    /// The fixed length of the sequence. The same in every version.
    pub fn len(&self) -> usize {
        return self.len;
    }

    /// True if the sequence was created with length zero.
    pub fn is_empty(&self) -> bool {
        return self.len == 0;
    }

    /// Read the element at `index` in the current version.
    pub fn get_value(&self, index: usize) -> Result<T, ArrayError> {
        if index >= self.len {
            return Err(ArrayError::IndexOutOfBounds);
        }

        let mut link = self.versions[self.cursor.current()].as_ref();
        while let Some(node) = link {
            if index == node.index {
                return Ok(node.value.clone());
            }
            link = if index < node.index {
                node.left.as_ref()
            } else {
                node.right.as_ref()
            };
        }

        // Construction inserts every index in 0..len, so an in-bounds miss
        // cannot happen; report it as a bounds failure rather than
        // fabricating a default.
        return Err(ArrayError::IndexOutOfBounds);
    }

    /// Write `value` at `index`, producing a new version.
    ///
    /// Any versions above the cursor are discarded first, so a write after
    /// `undo` starts a fresh branch.
    pub fn set_value(&mut self, index: usize, value: T) -> Result<(), ArrayError> {
        if index >= self.len {
            return Err(ArrayError::IndexOutOfBounds);
        }

        let root = match set_in(&self.versions[self.cursor.current()], index, value) {
            Some(root) => root,
            None => return Err(ArrayError::IndexOutOfBounds),
        };

        self.versions.truncate(self.cursor.current() + 1);
        self.versions.push(Some(root));
        self.cursor.commit();
        return Ok(());
    }

    /// Step forward through versions previously stepped back over.
    pub fn redo(&mut self, steps: usize) {
        self.cursor.redo(steps);
    }
}

impl<T> Versioned for PersistentArray<T> {
    fn last_version(&self) -> usize {
        return self.cursor.version_count();
    }

    fn undo(&mut self, steps: usize, clear_history: bool) {
        self.cursor.undo(steps);
        if clear_history {
            self.versions.truncate(self.cursor.current() + 1);
            self.cursor.clear_history();
        }
    }
}

/// Insert `index` into the tree under construction. Nodes are still
/// unshared at this point, so they can be grown in place.
fn create<T: Default>(link: &mut Link<T>, index: usize) {
    match link {
        None => {
            *link = Some(Rc::new(Node {
                index,
                value: T::default(),
                left: None,
                right: None,
            }));
        }
        Some(node) => {
            let node = Rc::get_mut(node).expect("nodes are unshared during construction");
            if index < node.index {
                create(&mut node.left, index);
            } else {
                create(&mut node.right, index);
            }
        }
    }
}

/// Path-copy the spine from `link` down to `index`, sharing every subtree
/// off the spine. Returns `None` if the index is not in the tree.
fn set_in<T: Clone>(link: &Link<T>, index: usize, value: T) -> Option<Rc<Node<T>>> {
    let node = link.as_ref()?;

    if index == node.index {
        return Some(Rc::new(Node {
            index: node.index,
            value,
            left: node.left.clone(),
            right: node.right.clone(),
        }));
    }

    if index < node.index {
        let left = set_in(&node.left, index, value)?;
        return Some(Rc::new(Node {
            index: node.index,
            value: node.value.clone(),
            left: Some(left),
            right: node.right.clone(),
        }));
    }

    let right = set_in(&node.right, index, value)?;
    return Some(Rc::new(Node {
        index: node.index,
        value: node.value.clone(),
        left: node.left.clone(),
        right: Some(right),
    }));
}
