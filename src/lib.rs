//! Embedded persistence core for the author/book object graph.
//! This crate is the single source of truth for storage invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::manager::AccessError;
pub use db::{DbError, DbManager, SchemaMigrationError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::author::{Author, AuthorId, AuthorValidationError, BookCollection};
pub use model::book::{Book, BookId};
pub use repo::author_repo::{AuthorRepository, SaveReport, SqliteAuthorRepository};
pub use repo::book_repo::SqliteBookRepository;
pub use repo::change_set::{ChangeSet, StagedChange};
pub use repo::{BookLoad, StoreError, StoreResult};
pub use service::library_service::{BookWrite, CommitEvent, CommitHook, LibraryService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
