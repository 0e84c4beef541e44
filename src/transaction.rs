//! All-or-nothing updates across several persistent containers.
//!
//! A transaction records each registered container's version count on
//! entry, then runs a caller-supplied action. If the action returns an
//! error, the transaction is marked failed, and when it goes out of scope
//! every container is rewound to its entry version with history clearing,
//! so the versions the failed action produced are erased as if they never
//! happened.
//!
//! The containers are independent, so rollback order does not matter, and
//! nothing here is safe to share across threads.

use std::cell::RefCell;
use std::rc::Rc;

use crate::versioned::Versioned;

/// A shared, rewindable handle on a persistent container.
pub type Handle = Rc<RefCell<dyn Versioned>>;

/// A scoped coordinator that rolls registered containers back when a
/// failed transaction is dropped.
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use rewind::map::PersistentMap;
/// use rewind::transaction::Transaction;
///
/// let map = Rc::new(RefCell::new(PersistentMap::with_seed(1)));
/// {
///     let mut tx = Transaction::new();
///     tx.add(map.clone());
///     tx.run(|| {
///         map.borrow_mut().insert(1, "one");
///         Err("changed my mind")
///     });
/// } // dropped as failed: the insert is rolled back
/// assert_eq!(map.borrow().find(&1), None);
/// ```
pub struct Transaction {
    containers: Vec<Handle>,
    entry_versions: Vec<usize>,
    succeeded: bool,
}

impl Transaction {
    /// Create a transaction over no containers; register them with `add`.
    pub fn new() -> Transaction {
        return Transaction {
            containers: Vec::new(),
            entry_versions: Vec::new(),
            succeeded: true,
        };
    }

    /// Register a container, recording its version count at this moment
    /// as the rollback target.
    pub fn add(&mut self, container: Handle) {
        self.entry_versions.push(container.borrow().last_version());
        self.containers.push(container);
    }

    /// Run `action`. An `Err` marks the transaction failed and is
    /// reported as `false`; the rollback itself happens when the
    /// transaction is dropped. A transaction that has failed once stays
    /// failed, whatever later runs return.
    pub fn run<E>(&mut self, action: impl FnOnce() -> Result<(), E>) -> bool {
        return match action() {
            Ok(()) => true,
            Err(_) => {
                self.succeeded = false;
                false
            }
        };
    }
}

impl Default for Transaction {
    fn default() -> Self {
        return Self::new();
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.succeeded {
            return;
        }
        for (container, entry) in self.containers.iter().zip(&self.entry_versions) {
            let mut container = container.borrow_mut();
            let steps = container.last_version().saturating_sub(*entry);
            container.undo(steps, true);
        }
    }
}
