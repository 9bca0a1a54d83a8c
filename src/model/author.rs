//! Author domain model and owned book collection.
//!
//! # Responsibility
//! - Define the parent record of the author/book graph.
//! - Make the loaded-vs-unloaded state of the owned collection explicit.
//!
//! # Invariants
//! - `id` is `None` until the store assigns a rowid on save.
//! - `BookCollection::Unloaded` means "not queried", which is distinct from
//!   a confirmed-empty `BookCollection::Loaded(vec![])`.
//! - Mutating the loaded collection only stages intent; nothing is durable
//!   until a save flushes the change set.

use crate::model::book::Book;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Integer surrogate key assigned by the store on insert.
pub type AuthorId = i64;

/// Load state of an author's owned book collection.
///
/// Call sites must state the relation set they need when querying; an
/// author fetched without its books carries `Unloaded` so that later
/// mutation code cannot mistake "not loaded" for "zero books".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookCollection {
    /// The relation was not requested by the originating query.
    Unloaded,
    /// The relation was materialized; the vector is the authoritative
    /// in-memory view of the author's books.
    Loaded(Vec<Book>),
}

impl Default for BookCollection {
    fn default() -> Self {
        Self::Unloaded
    }
}

impl BookCollection {
    /// Returns the loaded books, or `None` when the relation was never
    /// materialized.
    pub fn as_loaded(&self) -> Option<&[Book]> {
        match self {
            Self::Unloaded => None,
            Self::Loaded(books) => Some(books),
        }
    }

    /// Mutable access to the loaded books.
    pub fn as_loaded_mut(&mut self) -> Option<&mut Vec<Book>> {
        match self {
            Self::Unloaded => None,
            Self::Loaded(books) => Some(books),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Validation failures for author records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorValidationError {
    /// Both name components are blank; the natural key would be empty.
    EmptyName,
}

impl Display for AuthorValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "author first and last name are both empty"),
        }
    }
}

impl Error for AuthorValidationError {}

/// Parent record of the object graph; owns its books.
///
/// Looked up by (first, last) name as a natural key in this scope. That is
/// a documented design limitation: a real system needs an explicit unique
/// business key or a single-tenant assumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Surrogate key; `None` while staged, assigned on save.
    pub id: Option<AuthorId>,
    pub first_name: String,
    pub last_name: String,
    /// Owned collection; its lifecycle drives book row creation/deletion.
    pub books: BookCollection,
}

impl Author {
    /// Creates an unpersisted author with a confirmed-empty book collection.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            books: BookCollection::Loaded(Vec::new()),
        }
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), AuthorValidationError> {
        if self.first_name.trim().is_empty() && self.last_name.trim().is_empty() {
            return Err(AuthorValidationError::EmptyName);
        }
        Ok(())
    }

    /// Display name as rendered by the presentation layer.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Number of books, when the collection has been loaded.
    pub fn book_count(&self) -> Option<usize> {
        self.books.as_loaded().map(<[Book]>::len)
    }

    /// Looks up a loaded book by exact title.
    pub fn book_by_title(&self, title: &str) -> Option<&Book> {
        self.books
            .as_loaded()
            .and_then(|books| books.iter().find(|book| book.title == title))
    }

    /// Returns whether this author has been assigned a persistent identity.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
