//! Rewind - fully persistent containers with undo, redo, and transactions.
//!
//! Every mutation of a container produces a new version while all earlier
//! versions stay reachable; `undo` and `redo` move a cursor along the
//! version chain, and a mutation after `undo` starts a fresh branch. A
//! transaction coordinates several containers at once, rolling all of
//! them back if its action fails.
//!
//! # Quick Start
//!
//! ```
//! use rewind::array::PersistentArray;
//! use rewind::versioned::Versioned;
//!
//! // A fixed-length sequence of five zeros
//! let mut array = PersistentArray::new(5);
//!
//! // Writes create versions; reads follow the cursor
//! array.set_value(2, 7).unwrap();
//! assert_eq!(array.get_value(2), Ok(7));
//!
//! array.undo(1, false);
//! assert_eq!(array.get_value(2), Ok(0));
//!
//! array.redo(1);
//! assert_eq!(array.get_value(2), Ok(7));
//! ```

pub mod array;
pub mod list;
pub mod map;
pub mod transaction;
pub mod versioned;
