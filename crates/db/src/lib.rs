//! Local persistence for books and reading logs.
//!
//! The store keeps referential integrity itself: logs can only point at
//! existing books and deleting a book removes its logs in the same commit.

pub mod error;
pub mod records;
pub mod store;

pub use error::StoreError;
pub use records::{Book, BookStatus, ReadingLog};
pub use store::{Snapshot, Store, Transaction};
