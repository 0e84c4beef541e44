//! Persistent ordered map backed by a path-copied treap.
//!
//! Nodes are ordered as a search tree on keys and as a max-heap on random
//! priorities, which keeps the expected depth logarithmic without any
//! rebalancing bookkeeping. Inserts go through the classical split/merge:
//! split the tree around the new key, then merge the pieces back with the
//! new node between them. Every step copies only the spine it descends, so
//! versions share all untouched subtrees.
//!
//! Versions are an append-only vec of roots; version 0 is the empty treap.
//! `undo`/`redo` move the read cursor, and the next mutation after an
//! `undo` pops the abandoned versions before appending its own.

use std::cmp::Ordering;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::versioned::VersionCursor;
use crate::versioned::Versioned;

struct TreapNode<K, V> {
    key: K,
    value: V,
    priority: u64,
    left: Link<K, V>,
    right: Link<K, V>,
}

type Link<K, V> = Option<Rc<TreapNode<K, V>>>;

/// One immutable version: a treap root plus the key count under it.
struct MapVersion<K, V> {
    root: Link<K, V>,
    len: usize,
}

/// A persistent key-to-value map.
///
/// Every mutation produces a new version; `undo` and `redo` navigate
/// between them. Reads always see the version under the cursor.
pub struct PersistentMap<K, V> {
    cursor: VersionCursor,
    versions: Vec<MapVersion<K, V>>,
    rng: StdRng,
}

impl<K: Ord + Clone, V: Clone> PersistentMap<K, V> {
    /// Create an empty map with entropy-seeded priorities.
    pub fn new() -> PersistentMap<K, V> {
        return PersistentMap::with_rng(StdRng::from_entropy());
    }

    /// Create an empty map with deterministic priorities, for reproducible
    /// tests.
    pub fn with_seed(seed: u64) -> PersistentMap<K, V> {
        return PersistentMap::with_rng(StdRng::seed_from_u64(seed));
    }

    fn with_rng(rng: StdRng) -> PersistentMap<K, V> {
        return PersistentMap {
            cursor: VersionCursor::new(),
            versions: vec![MapVersion { root: None, len: 0 }],
            rng,
        };
    }

    fn current(&self) -> &MapVersion<K, V> {
        return &self.versions[self.cursor.current()];
    }

    /// The number of keys in the current version.
    pub fn len(&self) -> usize {
        return self.current().len;
    }

    /// True if the current version holds no keys.
    pub fn is_empty(&self) -> bool {
        return self.current().len == 0;
    }

    /// Look `key` up in the current version.
    pub fn find(&self, key: &K) -> Option<V> {
        let mut link = self.current().root.as_ref();
        while let Some(node) = link {
            match key.cmp(&node.key) {
                Ordering::Equal => return Some(node.value.clone()),
                Ordering::Less => link = node.left.as_ref(),
                Ordering::Greater => link = node.right.as_ref(),
            }
        }
        return None;
    }

    /// Insert `key` with `value`, producing a new version.
    ///
    /// A key that is already present keeps its place in the tree: only the
    /// spine down to it is copied and its priority is preserved. A new key
    /// goes through split/merge with a freshly drawn priority.
    pub fn insert(&mut self, key: K, value: V) {
        let current_len = self.current().len;

        if let Some(root) = update_in(&self.current().root, &key, &value) {
            self.commit(Some(root), current_len);
            return;
        }

        let priority = self.rng.gen::<u64>();
        let (left, right) = split(&self.current().root, &key);
        let node = Rc::new(TreapNode {
            key,
            value,
            priority,
            left: None,
            right: None,
        });
        let root = merge(merge(left, Some(node)), right);
        self.commit(root, current_len + 1);
    }

    /// Set `key` to `value`, producing a new version.
    ///
    /// An absent key is promoted to an insert; callers that want
    /// update-only semantics should `find` first.
    pub fn set_value(&mut self, key: K, value: V) {
        self.insert(key, value);
    }

    /// Remove `key`, producing a new version.
    ///
    /// Returns false, and creates no version, if the key is absent.
    pub fn erase(&mut self, key: &K) -> bool {
        if self.find(key).is_none() {
            return false;
        }

        let current_len = self.current().len;
        let root = erase_in(&self.current().root, key);
        self.commit(root, current_len - 1);
        return true;
    }

    /// Step forward through versions previously stepped back over.
    pub fn redo(&mut self, steps: usize) {
        self.cursor.redo(steps);
    }

    fn commit(&mut self, root: Link<K, V>, len: usize) {
        self.versions.truncate(self.cursor.current() + 1);
        self.versions.push(MapVersion { root, len });
        self.cursor.commit();
    }
}

impl<K: Ord + Clone, V: Clone> Default for PersistentMap<K, V> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<K, V> Versioned for PersistentMap<K, V> {
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

/// Copy `node` with the given children, keeping its key, value, and
/// priority.
fn rewire<K: Clone, V: Clone>(
    node: &TreapNode<K, V>,
    left: Link<K, V>,
    right: Link<K, V>,
) -> Rc<TreapNode<K, V>> {
    return Rc::new(TreapNode {
        key: node.key.clone(),
        value: node.value.clone(),
        priority: node.priority,
        left,
        right,
    });
}

/// Path-copy down to an existing `key` and replace its value, keeping the
/// node's priority so the heap shape is untouched. Returns `None` if the
/// key is absent.
fn update_in<K: Ord + Clone, V: Clone>(
    link: &Link<K, V>,
    key: &K,
    value: &V,
) -> Option<Rc<TreapNode<K, V>>> {
    let node = link.as_ref()?;

    return match key.cmp(&node.key) {
        Ordering::Equal => Some(Rc::new(TreapNode {
            key: node.key.clone(),
            value: value.clone(),
            priority: node.priority,
            left: node.left.clone(),
            right: node.right.clone(),
        })),
        Ordering::Less => {
            let left = update_in(&node.left, key, value)?;
            Some(rewire(node, Some(left), node.right.clone()))
        }
        Ordering::Greater => {
            let right = update_in(&node.right, key, value)?;
            Some(rewire(node, node.left.clone(), Some(right)))
        }
    };
}

/// Split the tree at `key`: every key `<= key` goes left, every key
/// `> key` goes right. The descended spine is copied; everything hanging
/// off it is shared with the input tree.
fn split<K: Ord + Clone, V: Clone>(link: &Link<K, V>, key: &K) -> (Link<K, V>, Link<K, V>) {
    let node = match link {
        None => return (None, None),
        Some(node) => node,
    };

    if node.key <= *key {
        let (mid, right) = split(&node.right, key);
        return (Some(rewire(node, node.left.clone(), mid)), right);
    } else {
        let (left, mid) = split(&node.left, key);
        return (left, Some(rewire(node, mid, node.right.clone())));
    }
}

/// Merge two trees where every key in `left` precedes every key in
/// `right`. The higher-priority root wins at each step, ties going right,
/// and the recursion spine is copied.
fn merge<K: Ord + Clone, V: Clone>(left: Link<K, V>, right: Link<K, V>) -> Link<K, V> {
    return match (left, right) {
        (None, right) => right,
        (left, None) => left,
        (Some(l), Some(r)) => {
            if l.priority <= r.priority {
                let left = merge(Some(l), r.left.clone());
                Some(rewire(&r, left, r.right.clone()))
            } else {
                let right = merge(l.right.clone(), Some(r));
                Some(rewire(&l, l.left.clone(), right))
            }
        }
    };
}

/// Path-copy down to `key` and replace its node with the merge of its
/// children. The caller has already checked that the key is present.
fn erase_in<K: Ord + Clone, V: Clone>(link: &Link<K, V>, key: &K) -> Link<K, V> {
    let node = link.as_ref().expect("presence checked by find");

    return match key.cmp(&node.key) {
        Ordering::Equal => merge(node.left.clone(), node.right.clone()),
        Ordering::Less => Some(rewire(node, erase_in(&node.left, key), node.right.clone())),
        Ordering::Greater => Some(rewire(node, node.left.clone(), erase_in(&node.right, key))),
    };
}
