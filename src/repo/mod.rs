//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts over authors/books.
//! - Own the change-tracking unit of work flushed by `save`.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths must call `Author::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - Call sites must state the relation set they need via [`BookLoad`].

use crate::db::manager::AccessError;
use crate::db::DbError;
use crate::model::author::AuthorValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod author_repo;
pub mod book_repo;
pub mod change_set;

pub type StoreResult<T> = Result<T, StoreError>;

/// Relation set requested by an author query.
///
/// `Bare` yields `BookCollection::Unloaded`; `WithBooks` materializes the
/// owned collection in the same logical query so later mutation never hits
/// a lazy-load surprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookLoad {
    Bare,
    WithBooks,
}

/// Store-level error taxonomy shared by repositories and the façade.
#[derive(Debug)]
pub enum StoreError {
    /// Connection bootstrap or migration failure; the store is unusable.
    Db(DbError),
    /// A record failed its own invariants before any SQL ran.
    Validation(AuthorValidationError),
    /// A save transaction failed and was rolled back; the staged change
    /// set is untouched and the same save may be retried.
    Persistence(rusqlite::Error),
    /// The shared connection could not be acquired for a write.
    Concurrency(AccessError),
    /// A staged child could not be resolved to a persisted owner, or an
    /// update targeted a row that does not exist.
    NotFound(String),
    /// Persisted state violated a model invariant on read.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "save failed and was rolled back: {err}"),
            Self::Concurrency(err) => write!(f, "{err}"),
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::Concurrency(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<AuthorValidationError> for StoreError {
    fn from(value: AuthorValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<AccessError> for StoreError {
    fn from(value: AccessError) -> Self {
        Self::Concurrency(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
