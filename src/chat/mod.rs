//! Derived chat views over the notification store.
//!
//! Threads and message lists are projections: pure functions of the caller's
//! notification set, recomputed on every read. Nothing in this module touches
//! the database.

pub mod merger;
pub mod projector;

pub use merger::merge_messages;
pub use projector::build_chat_list;
