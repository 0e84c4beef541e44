//! Persistent doubly-linked list built from fat nodes.
//!
//! Every logical cell is a node holding up to two versioned snapshots of
//! itself: `(version, value, left, right)`. The first snapshot is written
//! when the node is allocated; the second is a one-shot fill used the first
//! time the node changes. Only when a full node changes again does the
//! list allocate a replacement and path-copy outward, stopping each walk at
//! the first neighbour with a free second slot. Most updates therefore
//! touch a constant number of nodes instead of a whole spine.
//!
//! A read at version `v` picks the snapshot with the greatest
//! `snapshot.version <= v`. A sentinel tail node (no right neighbour)
//! always exists and doubles as the end iterator position. `heads` and
//! `tails` record every node that has ever been an extreme; the extreme
//! valid at a version is the newest entry born at or before it.
//!
//! The one-shot fills are interior mutation, so the invalidator journals
//! every fill and allocation. Before each mutation, and on
//! `undo(.., clear_history = true)`, it erases everything born above the
//! cursor: abandoned fills are emptied again and abandoned extremes are
//! popped, so a mutation after `undo` re-enters a branch that never
//! existed.
//!
//! Left references are weak. Every node of every version is strongly
//! reachable from that version's registered head through right links, so
//! the weak side never dangles for a valid read and the cross-version
//! reference graph stays acyclic for the reference counter.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::rc::Weak;

use crate::versioned::VersionCursor;
use crate::versioned::Versioned;

/// Error returned by iterator operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    /// The iterator sits on the end sentinel, walked off an end of the
    /// list, or belongs to a version the list cannot currently see.
    InvalidIterator,
}

/// One versioned snapshot of a node: its value and both neighbours as they
/// were when the snapshot became live.
struct Snapshot<T> {
    version: usize,
    /// `None` only on sentinel tails, which hold no element.
    value: Option<T>,
    left: Option<Weak<ListNode<T>>>,
    right: Option<Rc<ListNode<T>>>,
}

struct Slots<T> {
    first: Snapshot<T>,
    second: Option<Snapshot<T>>,
}

/// A fat node. The `RefCell` admits exactly two kinds of writes after
/// publication: the one-shot fill of the second slot, and the invalidator
/// erasing snapshots that belong to discarded versions.
struct ListNode<T> {
    slots: RefCell<Slots<T>>,
}

type NodeRc<T> = Rc<ListNode<T>>;

impl<T: Clone> ListNode<T> {
    fn alloc(value: Option<T>, version: usize) -> NodeRc<T> {
        return Rc::new(ListNode {
            slots: RefCell::new(Slots {
                first: Snapshot {
                    version,
                    value,
                    left: None,
                    right: None,
                },
                second: None,
            }),
        });
    }

    fn is_full(&self) -> bool {
        return self.slots.borrow().second.is_some();
    }

    fn first_version(&self) -> usize {
        return self.slots.borrow().first.version;
    }

    /// Fill the second slot at `version`, inheriting the first snapshot's
    /// links. `value` is the node's own value for neighbour fills, or the
    /// replacement value for an in-place `set_val`.
    fn fill_second(&self, value: Option<T>, version: usize) {
        let mut slots = self.slots.borrow_mut();
        debug_assert!(slots.second.is_none());
        let snapshot = Snapshot {
            version,
            value,
            left: slots.first.left.clone(),
            right: slots.first.right.clone(),
        };
        slots.second = Some(snapshot);
    }

    fn set_left(&self, left: Option<&NodeRc<T>>, in_second: bool) {
        let mut slots = self.slots.borrow_mut();
        let link = left.map(Rc::downgrade);
        if in_second {
            slots.second.as_mut().expect("second slot is filled").left = link;
        } else {
            slots.first.left = link;
        }
    }

    fn set_right(&self, right: Option<NodeRc<T>>, in_second: bool) {
        let mut slots = self.slots.borrow_mut();
        if in_second {
            slots.second.as_mut().expect("second slot is filled").right = right;
        } else {
            slots.first.right = right;
        }
    }

    fn left_at(&self, version: usize) -> Option<NodeRc<T>> {
        let slots = self.slots.borrow();
        if version < slots.first.version {
            return None;
        }
        return select(&slots, version)
            .left
            .as_ref()
            .and_then(|weak| weak.upgrade());
    }

    fn right_at(&self, version: usize) -> Option<NodeRc<T>> {
        let slots = self.slots.borrow();
        if version < slots.first.version {
            return None;
        }
        return select(&slots, version).right.clone();
    }

    fn value_at(&self, version: usize) -> Option<T> {
        let slots = self.slots.borrow();
        if version < slots.first.version {
            return None;
        }
        return select(&slots, version).value.clone();
    }

    /// Erase whatever this node holds above `version`. Returns false, and
    /// touches nothing, when the node's newest snapshot is still live —
    /// the journal is version-ordered, so the caller stops there.
    fn clear_discarded(&self, version: usize) -> bool {
        let mut slots = self.slots.borrow_mut();
        let newest_version = match &slots.second {
            Some(second) => second.version,
            None => slots.first.version,
        };
        if newest_version <= version {
            return false;
        }
        if slots.second.is_some() {
            slots.second = None;
        } else {
            slots.first.left = None;
            slots.first.right = None;
        }
        return true;
    }
}

/// The snapshot visible at `version`: the second iff it exists and is old
/// enough, the first otherwise.
fn select<T>(slots: &Slots<T>, version: usize) -> &Snapshot<T> {
    return match &slots.second {
        Some(second) if second.version <= version => second,
        _ => &slots.first,
    };
}

/// A handle on one list cell. Iterators read through the list, so they
/// always observe the list's current version; an iterator kept across
/// `undo` keeps working as long as its node exists in the visible version.
pub struct ListIter<T> {
    node: NodeRc<T>,
}

impl<T> fmt::Debug for ListIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("ListIter")
            .field("node", &Rc::as_ptr(&self.node))
            .finish();
    }
}

impl<T> Clone for ListIter<T> {
    fn clone(&self) -> Self {
        return ListIter {
            node: Rc::clone(&self.node),
        };
    }
}

impl<T> PartialEq for ListIter<T> {
    /// Two iterators are equal when they sit on the same cell; an iterator
    /// that walked to the sentinel compares equal to `end()`.
    fn eq(&self, other: &Self) -> bool {
        return Rc::ptr_eq(&self.node, &other.node);
    }
}

impl<T> Eq for ListIter<T> {}

/// Journal of interior mutations plus the extreme-node registries.
///
/// `journal` holds every fill and allocation in version order, newest
/// last. `invalidate` peels the suffix born above the cursor, restoring
/// the nodes as if the abandoned versions had never happened, and prunes
/// `heads`/`tails` the same way.
struct Invalidator<T> {
    journal: Vec<NodeRc<T>>,
    heads: Vec<NodeRc<T>>,
    tails: Vec<NodeRc<T>>,
}

impl<T: Clone> Invalidator<T> {
    fn new(sentinel: NodeRc<T>) -> Invalidator<T> {
        return Invalidator {
            journal: Vec::new(),
            heads: vec![sentinel.clone()],
            tails: vec![sentinel],
        };
    }

    fn add(&mut self, node: NodeRc<T>) {
        self.journal.push(node);
    }

    fn add_head(&mut self, node: NodeRc<T>) {
        self.heads.push(node);
    }

    fn add_tail(&mut self, node: NodeRc<T>) {
        self.tails.push(node);
    }

    fn head_at(&self, version: usize) -> NodeRc<T> {
        for node in self.heads.iter().rev() {
            if node.first_version() <= version {
                return node.clone();
            }
        }
        return self.heads[0].clone();
    }

    fn tail_at(&self, version: usize) -> NodeRc<T> {
        for node in self.tails.iter().rev() {
            if node.first_version() <= version {
                return node.clone();
            }
        }
        return self.tails[0].clone();
    }

    /// If the newest head record gained a left neighbour at `version`, the
    /// neighbour is the true leftmost node; advance the record onto it.
    fn update_last_head(&mut self, version: usize) {
        let newest = self.heads.last().expect("a head always exists").clone();
        if let Some(left) = newest.left_at(version) {
            *self.heads.last_mut().expect("a head always exists") = left;
        }
    }

    fn invalidate(&mut self, version: usize) {
        loop {
            let cleared = match self.journal.last() {
                Some(node) => node.clear_discarded(version),
                None => break,
            };
            if cleared {
                self.journal.pop();
            } else {
                break;
            }
        }
        while self
            .heads
            .last()
            .map_or(false, |node| node.first_version() > version)
        {
            self.heads.pop();
        }
        while self
            .tails
            .last()
            .map_or(false, |node| node.first_version() > version)
        {
            self.tails.pop();
        }
    }
}

/// A persistent sequence with iterator-based editing.
///
/// Every mutation produces a new version; `undo` and `redo` navigate
/// between them. Reads always see the version under the cursor.
pub struct PersistentList<T> {
    cursor: VersionCursor,
    invalidator: Invalidator<T>,
    /// Element count per version.
    lens: Vec<usize>,
}

impl<T: Clone> PersistentList<T> {
    /// Create an empty list. The initial version holds only the sentinel
    /// tail.
    pub fn new() -> PersistentList<T> {
        let sentinel = ListNode::alloc(None, 0);
        return PersistentList {
            cursor: VersionCursor::new(),
            invalidator: Invalidator::new(sentinel),
            lens: vec![0],
        };
    }

    /// The element count of the current version.
    pub fn len(&self) -> usize {
        return self.lens[self.cursor.current()];
    }

    /// True if the current version holds no elements.
    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// An iterator on the leftmost node of the current version. On an
    /// empty list this is the sentinel, and `done` is immediately true.
    pub fn begin(&self) -> ListIter<T> {
        return ListIter {
            node: self.invalidator.head_at(self.cursor.current()),
        };
    }

    /// An iterator on the sentinel tail of the current version.
    pub fn end(&self) -> ListIter<T> {
        return ListIter {
            node: self.invalidator.tail_at(self.cursor.current()),
        };
    }

    /// True iff the iterator sits on the sentinel tail of the current
    /// version.
    pub fn done(&self, iter: &ListIter<T>) -> bool {
        return iter.node.right_at(self.cursor.current()).is_none();
    }

    /// Step the iterator to its right neighbour. Stepping off the sentinel
    /// fails and leaves the iterator in place.
    pub fn next(&self, iter: &mut ListIter<T>) -> Result<(), ListError> {
        return match iter.node.right_at(self.cursor.current()) {
            Some(node) => {
                iter.node = node;
                Ok(())
            }
            None => Err(ListError::InvalidIterator),
        };
    }

    /// Step the iterator to its left neighbour. Stepping off the head
    /// fails and leaves the iterator in place.
    pub fn prev(&self, iter: &mut ListIter<T>) -> Result<(), ListError> {
        return match iter.node.left_at(self.cursor.current()) {
            Some(node) => {
                iter.node = node;
                Ok(())
            }
            None => Err(ListError::InvalidIterator),
        };
    }

    /// Read the element under the iterator in the current version. The
    /// sentinel holds no element.
    pub fn get_val(&self, iter: &ListIter<T>) -> Result<T, ListError> {
        let version = self.cursor.current();
        if iter.node.right_at(version).is_none() {
            return Err(ListError::InvalidIterator);
        }
        return iter.node.value_at(version).ok_or(ListError::InvalidIterator);
    }

    /// Replace the element under the iterator, producing a new version.
    ///
    /// If the node's second slot is free, the new value fills it in place.
    /// A full node is replaced by a fresh one, path-copying outward to the
    /// first fillable neighbour on each side.
    pub fn set_val(&mut self, iter: &ListIter<T>, value: T) -> Result<(), ListError> {
        let version = self.cursor.current();
        if version < iter.node.first_version() || iter.node.right_at(version).is_none() {
            return Err(ListError::InvalidIterator);
        }
        self.invalidator.invalidate(version);

        if !iter.node.is_full() {
            iter.node.fill_second(Some(value), version + 1);
            self.invalidator.add(iter.node.clone());
        } else {
            let fresh = ListNode::alloc(Some(value), version + 1);
            self.invalidator.add(fresh.clone());
            if iter.node.left_at(version).is_none() {
                self.invalidator.add_head(fresh.clone());
            }
            let mut prev = fresh.clone();
            self.copy_left(iter.node.left_at(version), &mut prev, version);
            let mut prev = fresh;
            self.copy_right(iter.node.right_at(version), &mut prev, version);
        }

        self.invalidator.update_last_head(version + 1);
        let len = self.lens[version];
        self.commit(len);
        return Ok(());
    }

    /// Insert `value` before the iterator's node, producing a new version.
    ///
    /// The iterator is rebound to the node that now follows the new value,
    /// so its logical position is unchanged; the returned iterator sits on
    /// the new node. Inserting before `end()` appends.
    pub fn insert(&mut self, iter: &mut ListIter<T>, value: T) -> Result<ListIter<T>, ListError> {
        let version = self.cursor.current();
        if version < iter.node.first_version() {
            return Err(ListError::InvalidIterator);
        }
        self.invalidator.invalidate(version);

        let node = ListNode::alloc(Some(value), version + 1);
        self.invalidator.add(node.clone());
        if iter.node.left_at(version).is_none() {
            self.invalidator.add_head(node.clone());
        }

        let mut prev = node.clone();
        self.copy_left(iter.node.left_at(version), &mut prev, version);
        let mut prev = node.clone();
        self.copy_right(Some(iter.node.clone()), &mut prev, version);

        self.invalidator.update_last_head(version + 1);
        let len = self.lens[version];
        self.commit(len + 1);

        let follow = node
            .right_at(self.cursor.current())
            .expect("an inserted node is wired to a right neighbour");
        iter.node = follow;
        return Ok(ListIter { node });
    }

    /// Remove the iterator's node, producing a new version. The sentinel
    /// cannot be erased. Returns an iterator on the node that now follows
    /// the erased position.
    pub fn erase(&mut self, iter: ListIter<T>) -> Result<ListIter<T>, ListError> {
        let version = self.cursor.current();
        if version < iter.node.first_version() {
            return Err(ListError::InvalidIterator);
        }
        let right_node = match iter.node.right_at(version) {
            Some(node) => node,
            None => return Err(ListError::InvalidIterator),
        };
        self.invalidator.invalidate(version);

        let left_node = iter.node.left_at(version);
        let mut left_clone: Option<NodeRc<T>> = None;
        let mut right_clone: Option<NodeRc<T>> = None;

        if let Some(left) = &left_node {
            if !left.is_full() {
                let value = left.value_at(version);
                left.fill_second(value, version + 1);
                self.invalidator.add(left.clone());
            } else {
                let clone = ListNode::alloc(left.value_at(version), version + 1);
                self.invalidator.add(clone.clone());
                if left.left_at(version).is_none() {
                    self.invalidator.add_head(clone.clone());
                }
                let mut prev = clone.clone();
                self.copy_left(left.left_at(version), &mut prev, version);
                left_clone = Some(clone);
            }
        }

        if !right_node.is_full() {
            let value = right_node.value_at(version);
            right_node.fill_second(value, version + 1);
            self.invalidator.add(right_node.clone());
            if left_node.is_none() {
                // erased the head: the right neighbour is the new leftmost
                right_node.set_left(None, true);
                self.invalidator.add_head(right_node.clone());
            }
        } else {
            let clone = ListNode::alloc(right_node.value_at(version), version + 1);
            self.invalidator.add(clone.clone());
            if left_node.is_none() {
                self.invalidator.add_head(clone.clone());
            }
            if right_node.right_at(version).is_none() {
                // the sentinel itself was cloned: record the new tail
                self.invalidator.add_tail(clone.clone());
            }
            let mut prev = clone.clone();
            self.copy_right(right_node.right_at(version), &mut prev, version);
            right_clone = Some(clone);
        }

        if let Some(left) = &left_node {
            match (&left_clone, &right_clone) {
                (None, None) => {
                    left.set_right(Some(right_node.clone()), true);
                    right_node.set_left(Some(left), true);
                }
                (None, Some(rc)) => {
                    left.set_right(Some(rc.clone()), true);
                    rc.set_left(Some(left), false);
                }
                (Some(lc), None) => {
                    lc.set_right(Some(right_node.clone()), false);
                    right_node.set_left(Some(lc), true);
                }
                (Some(lc), Some(rc)) => {
                    lc.set_right(Some(rc.clone()), false);
                    rc.set_left(Some(lc), false);
                }
            }
        }

        self.invalidator.update_last_head(version + 1);
        let len = self.lens[version];
        self.commit(len - 1);

        return Ok(ListIter {
            node: right_clone.unwrap_or(right_node),
        });
    }

    /// The elements of the current version, leftmost first.
    pub fn values(&self) -> Vec<T> {
        let mut out = Vec::new();
        let mut iter = self.begin();
        while !self.done(&iter) {
            out.push(
                self.get_val(&iter)
                    .expect("nodes before the sentinel hold a value"),
            );
            self.next(&mut iter)
                .expect("nodes before the sentinel have a right neighbour");
        }
        return out;
    }

    /// Step forward through versions previously stepped back over.
    pub fn redo(&mut self, steps: usize) {
        self.cursor.redo(steps);
    }

    fn commit(&mut self, len: usize) {
        self.lens.truncate(self.cursor.current() + 1);
        self.lens.push(len);
        self.cursor.commit();
    }

    /// Walk leftward from `from`, rewiring each node to `prev` at
    /// `version + 1`: full nodes are cloned and the walk continues, the
    /// first fillable node absorbs the change and the walk stops.
    fn copy_left(&mut self, from: Option<NodeRc<T>>, prev: &mut NodeRc<T>, version: usize) {
        let mut cur = from;
        while let Some(node) = cur {
            if node.is_full() {
                let copy = ListNode::alloc(node.value_at(version), version + 1);
                prev.set_left(Some(&copy), false);
                copy.set_right(Some(prev.clone()), false);
                self.invalidator.add(copy.clone());
                if node.left_at(version).is_none() {
                    self.invalidator.add_head(copy.clone());
                }
                cur = node.left_at(version);
                *prev = copy;
            } else {
                let value = node.value_at(version);
                node.fill_second(value, version + 1);
                node.set_right(Some(prev.clone()), true);
                prev.set_left(Some(&node), false);
                self.invalidator.add(node);
                break;
            }
        }
    }

    /// Mirror of `copy_left`, walking rightward. Cloning the node with no
    /// right neighbour means the sentinel moved, so the clone is recorded
    /// as a tail.
    fn copy_right(&mut self, from: Option<NodeRc<T>>, prev: &mut NodeRc<T>, version: usize) {
        let mut cur = from;
        while let Some(node) = cur {
            if node.is_full() {
                let copy = ListNode::alloc(node.value_at(version), version + 1);
                prev.set_right(Some(copy.clone()), false);
                copy.set_left(Some(&*prev), false);
                self.invalidator.add(copy.clone());
                if node.right_at(version).is_none() {
                    self.invalidator.add_tail(copy.clone());
                }
                cur = node.right_at(version);
                *prev = copy;
            } else {
                let value = node.value_at(version);
                node.fill_second(value, version + 1);
                node.set_left(Some(&*prev), true);
                prev.set_right(Some(node.clone()), false);
                self.invalidator.add(node);
                break;
            }
        }
    }
}

impl<T: Clone> Default for PersistentList<T> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<T: Clone> Versioned for PersistentList<T> {
    fn last_version(&self) -> usize {
        return self.cursor.version_count();
    }

    fn undo(&mut self, steps: usize, clear_history: bool) {
        self.cursor.undo(steps);
        if clear_history {
            self.invalidator.invalidate(self.cursor.current());
            self.lens.truncate(self.cursor.current() + 1);
            self.cursor.clear_history();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a list by repeatedly inserting before the previous insertion,
    /// so the values appear left to right in the given order.
    fn list_of(values: &[i32]) -> PersistentList<i32> {
        let mut list = PersistentList::new();
        let mut iter = list.end();
        for value in values.iter().rev() {
            iter = list.insert(&mut iter, *value).unwrap();
        }
        return list;
    }

    #[test]
    fn empty_list_begin_is_done() {
        let list: PersistentList<i32> = PersistentList::new();
        let iter = list.begin();
        assert!(list.done(&iter));
        assert_eq!(list.get_val(&iter), Err(ListError::InvalidIterator));
        assert_eq!(list.len(), 0);
        assert_eq!(list.last_version(), 1);
    }

    #[test]
    fn begin_equals_end_on_empty_list() {
        let list: PersistentList<i32> = PersistentList::new();
        assert_eq!(list.begin(), list.end());
    }

    #[test]
    fn insert_before_begin_builds_in_reverse() {
        let mut list = PersistentList::new();
        let mut iter = list.begin();
        iter = list.insert(&mut iter, 3).unwrap();
        iter = list.insert(&mut iter, 2).unwrap();
        let _ = list.insert(&mut iter, 1).unwrap();
        assert_eq!(list.values(), vec![1, 2, 3]);

        list.undo(1, false);
        assert_eq!(list.values(), vec![2, 3]);
        list.undo(2, false);
        assert_eq!(list.values(), Vec::<i32>::new());
        list.redo(3);
        assert_eq!(list.values(), vec![1, 2, 3]);
    }

    #[test]
    fn insert_rebinds_the_iterator_to_the_follower() {
        let mut list = PersistentList::new();
        let mut iter = list.end();
        let first = list.insert(&mut iter, 1).unwrap();
        // iter stayed at the end, so a second insert appends
        let _ = list.insert(&mut iter, 2).unwrap();
        assert_eq!(list.values(), vec![1, 2]);
        assert_eq!(list.get_val(&first), Ok(1));
    }

    #[test]
    fn next_walks_to_the_sentinel() {
        let list = list_of(&[1, 2, 3]);
        let mut iter = list.begin();
        assert_eq!(list.get_val(&iter), Ok(1));
        list.next(&mut iter).unwrap();
        assert_eq!(list.get_val(&iter), Ok(2));
        list.next(&mut iter).unwrap();
        assert_eq!(list.get_val(&iter), Ok(3));
        list.next(&mut iter).unwrap();
        assert!(list.done(&iter));
        assert_eq!(iter, list.end());
        assert_eq!(list.next(&mut iter), Err(ListError::InvalidIterator));
    }

    #[test]
    fn prev_walks_back_from_the_end() {
        let list = list_of(&[1, 2, 3]);
        let mut iter = list.end();
        list.prev(&mut iter).unwrap();
        assert_eq!(list.get_val(&iter), Ok(3));
        list.prev(&mut iter).unwrap();
        list.prev(&mut iter).unwrap();
        assert_eq!(list.get_val(&iter), Ok(1));
        assert_eq!(list.prev(&mut iter), Err(ListError::InvalidIterator));
        assert_eq!(list.get_val(&iter), Ok(1));
    }

    #[test]
    fn set_val_fills_then_escalates() {
        // the head was inserted last, so it is the one node whose second
        // slot is still free
        let mut list = list_of(&[10, 20, 30]);
        let iter = list.begin();
        assert!(!iter.node.is_full());
        let version_before = list.last_version();

        // first write fills the node's second slot in place
        list.set_val(&iter, 11).unwrap();
        assert!(iter.node.is_full());
        assert_eq!(list.values(), vec![11, 20, 30]);

        // second write finds the node full and escalates to a fresh node
        list.set_val(&iter, 12).unwrap();
        assert_eq!(list.values(), vec![12, 20, 30]);
        assert!(!Rc::ptr_eq(&list.begin().node, &iter.node));
        assert_eq!(list.last_version(), version_before + 2);

        list.undo(1, false);
        assert_eq!(list.values(), vec![11, 20, 30]);
        list.undo(1, false);
        assert_eq!(list.values(), vec![10, 20, 30]);
        list.redo(2);
        assert_eq!(list.values(), vec![12, 20, 30]);
    }

    #[test]
    fn set_val_on_the_sentinel_fails() {
        let mut list = list_of(&[1]);
        let end = list.end();
        assert_eq!(list.set_val(&end, 9), Err(ListError::InvalidIterator));
        assert_eq!(list.last_version(), 2);
    }

    #[test]
    fn erase_middle_skips_the_node() {
        let mut list = list_of(&[1, 2, 3]);
        let mut iter = list.begin();
        list.next(&mut iter).unwrap();
        let after = list.erase(iter).unwrap();
        assert_eq!(list.values(), vec![1, 3]);
        assert_eq!(list.get_val(&after), Ok(3));

        list.undo(1, false);
        assert_eq!(list.values(), vec![1, 2, 3]);
    }

    #[test]
    fn erase_head_promotes_the_right_neighbour() {
        let mut list = list_of(&[1, 2]);
        let after = list.erase(list.begin()).unwrap();
        assert_eq!(list.values(), vec![2]);
        assert_eq!(list.get_val(&after), Ok(2));
        // the new head has no left neighbour
        let mut iter = list.begin();
        assert_eq!(list.get_val(&iter), Ok(2));
        assert_eq!(list.prev(&mut iter), Err(ListError::InvalidIterator));
    }

    #[test]
    fn erase_last_element_leaves_an_empty_list() {
        let mut list = list_of(&[7]);
        let after = list.erase(list.begin()).unwrap();
        assert!(list.done(&after));
        assert!(list.is_empty());
        assert_eq!(list.values(), Vec::<i32>::new());
        list.undo(1, false);
        assert_eq!(list.values(), vec![7]);
    }

    #[test]
    fn erase_before_a_full_sentinel_registers_the_new_tail() {
        let mut list = PersistentList::new();
        let mut iter = list.end();
        // the first insert fills the sentinel's second slot, making it full
        let _ = list.insert(&mut iter, 1).unwrap();
        // erasing the element now clones the sentinel
        let after = list.erase(list.begin()).unwrap();
        assert!(list.done(&after));
        // end() must resolve to the clone, not the stale full sentinel
        assert_eq!(list.end(), after);
        assert_eq!(list.begin(), list.end());
    }

    #[test]
    fn erase_the_sentinel_fails() {
        let mut list = list_of(&[1]);
        let end = list.end();
        assert_eq!(list.erase(end), Err(ListError::InvalidIterator));
    }

    #[test]
    fn mutation_after_undo_truncates_the_branch() {
        let mut list = list_of(&[1, 2]);
        list.undo(1, false);
        assert_eq!(list.values(), vec![2]);

        let mut iter = list.begin();
        let _ = list.insert(&mut iter, 9).unwrap();
        assert_eq!(list.values(), vec![9, 2]);
        assert_eq!(list.last_version(), 3);
        // the branch holding [1, 2] is gone
        list.redo(5);
        assert_eq!(list.values(), vec![9, 2]);
    }

    #[test]
    fn heads_from_discarded_branches_are_invisible() {
        let mut list = list_of(&[5]);
        // branch one: a new head 4
        let mut iter = list.begin();
        let _ = list.insert(&mut iter, 4).unwrap();
        assert_eq!(list.values(), vec![4, 5]);

        // abandon it and grow a different head
        list.undo(1, false);
        let mut iter = list.begin();
        let _ = list.insert(&mut iter, 6).unwrap();
        assert_eq!(list.values(), vec![6, 5]);

        list.undo(1, false);
        assert_eq!(list.values(), vec![5]);
        list.redo(1);
        assert_eq!(list.values(), vec![6, 5]);
    }

    #[test]
    fn stale_iterator_from_a_discarded_version_fails() {
        let mut list = list_of(&[1]);
        let mut iter = list.begin();
        let fresh = list.insert(&mut iter, 0).unwrap();
        list.undo(1, false);
        // `fresh` was born in the version we stepped off
        assert_eq!(list.get_val(&fresh), Err(ListError::InvalidIterator));
        assert_eq!(list.set_val(&fresh, 9), Err(ListError::InvalidIterator));
        list.redo(1);
        assert_eq!(list.get_val(&fresh), Ok(0));
    }

    #[test]
    fn undo_with_clear_history_cannot_be_redone() {
        let mut list = list_of(&[1, 2]);
        list.undo(1, true);
        assert_eq!(list.last_version(), 2);
        list.redo(5);
        assert_eq!(list.values(), vec![2]);

        // the freed slots are reusable on a fresh branch
        let mut iter = list.begin();
        let _ = list.insert(&mut iter, 9).unwrap();
        assert_eq!(list.values(), vec![9, 2]);
    }

    #[test]
    fn clear_history_erases_pending_fills() {
        let mut list = list_of(&[1, 2]);
        let iter = list.begin();
        list.set_val(&iter, 9).unwrap();
        assert_eq!(list.values(), vec![9, 2]);

        list.undo(1, true);
        assert_eq!(list.values(), vec![1, 2]);
        assert_eq!(list.last_version(), 3);
        list.redo(5);
        assert_eq!(list.values(), vec![1, 2]);

        // the wiped slot is free again: the next write fills it at the
        // same version number the discarded branch used
        list.set_val(&iter, 7).unwrap();
        assert_eq!(list.values(), vec![7, 2]);
        list.undo(1, false);
        assert_eq!(list.values(), vec![1, 2]);
    }

    #[test]
    fn len_tracks_every_version() {
        let mut list = PersistentList::new();
        let mut iter = list.end();
        iter = list.insert(&mut iter, 1).unwrap();
        let _ = list.insert(&mut iter, 0).unwrap();
        assert_eq!(list.len(), 2);
        list.erase(list.begin()).unwrap();
        assert_eq!(list.len(), 1);
        list.undo(1, false);
        assert_eq!(list.len(), 2);
        list.undo(2, false);
        assert_eq!(list.len(), 0);
        list.redo(3);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn insert_in_the_middle() {
        let mut list = list_of(&[1, 3]);
        let mut iter = list.begin();
        list.next(&mut iter).unwrap();
        let at_two = list.insert(&mut iter, 2).unwrap();
        assert_eq!(list.values(), vec![1, 2, 3]);
        assert_eq!(list.get_val(&at_two), Ok(2));
        // the rebound iterator still sits on its old element
        assert_eq!(list.get_val(&iter), Ok(3));
    }

    #[test]
    fn long_edit_session_round_trips() {
        let mut list = PersistentList::new();
        let mut iter = list.end();
        for value in (0..20).rev() {
            iter = list.insert(&mut iter, value).unwrap();
        }
        let expected: Vec<i32> = (0..20).collect();
        assert_eq!(list.values(), expected);

        // delete every even element front to back
        let mut iter = list.begin();
        while !list.done(&iter) {
            let value = list.get_val(&iter).unwrap();
            if value % 2 == 0 {
                iter = list.erase(iter).unwrap();
            } else {
                list.next(&mut iter).unwrap();
            }
        }
        let odds: Vec<i32> = (0..20).filter(|v| v % 2 == 1).collect();
        assert_eq!(list.values(), odds);

        // ten erasures happened; rewind them all
        list.undo(10, false);
        assert_eq!(list.values(), expected);
        list.redo(10);
        assert_eq!(list.values(), odds);
    }

    #[test]
    fn set_val_through_a_stale_iterator_still_lands() {
        let mut list = list_of(&[1, 2, 3, 4, 5]);
        let mut iter = list.begin();
        list.next(&mut iter).unwrap();
        list.next(&mut iter).unwrap();

        // the middle node is already full, so each write through the old
        // handle escalates, cloning outward through its full neighbours
        list.set_val(&iter, 30).unwrap();
        assert_eq!(list.values(), vec![1, 2, 30, 4, 5]);
        list.set_val(&iter, 31).unwrap();
        assert_eq!(list.values(), vec![1, 2, 31, 4, 5]);

        // re-resolving lands on the replacement, whose slot is free
        let mut iter = list.begin();
        list.next(&mut iter).unwrap();
        list.next(&mut iter).unwrap();
        list.set_val(&iter, 32).unwrap();
        assert_eq!(list.values(), vec![1, 2, 32, 4, 5]);

        list.undo(3, false);
        assert_eq!(list.values(), vec![1, 2, 3, 4, 5]);
    }
}
