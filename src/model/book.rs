//! Book domain model.
//!
//! # Responsibility
//! - Define the owned child record of an [`Author`](crate::model::author::Author).
//!
//! # Invariants
//! - `id` is `None` until the store assigns a rowid on save.
//! - `author_id` mirrors the persisted foreign key; it is `None` only while
//!   the book is staged under a not-yet-persisted author.

use serde::{Deserialize, Serialize};

/// Integer surrogate key assigned by the store on insert.
pub type BookId = i64;

/// A single book row owned by one author.
///
/// The original object graph kept a resolved back-pointer to the owning
/// author; here the foreign key plus the `Author` value the caller already
/// holds cover that navigation without cyclic references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Surrogate key; `None` while staged, assigned on save.
    pub id: Option<BookId>,
    /// Display title. Uniqueness per author is a façade policy, not a
    /// schema constraint.
    pub title: String,
    /// Foreign key to the owning author row.
    pub author_id: Option<i64>,
}

impl Book {
    /// Creates an unpersisted book with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            author_id: None,
        }
    }

    /// Returns whether this book has been assigned a persistent identity.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::Book;

    #[test]
    fn new_book_is_unpersisted() {
        let book = Book::new("My Story Part 1");
        assert_eq!(book.id, None);
        assert_eq!(book.author_id, None);
        assert!(!book.is_persisted());
    }
}
