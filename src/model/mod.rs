//! Domain model for the author/book object graph.
//!
//! # Responsibility
//! - Define the canonical data structures used by core persistence logic.
//! - Keep identity assignment and collection-load state explicit in types.
//!
//! # Invariants
//! - Surrogate keys are `None` until the store assigns them on save.
//! - An owned book collection is either `Unloaded` or `Loaded`, never an
//!   ambiguous empty list.

pub mod author;
pub mod book;
