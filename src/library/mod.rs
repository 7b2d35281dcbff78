//! Library of precomputed predictions.
//!
//! The model server publishes an index of books whose predictions were
//! computed ahead of time; loading one replaces the session text and events
//! just like a live submission.

pub mod catalog;

pub use catalog::{Book, Catalog};
