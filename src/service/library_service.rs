//! Persistence façade for the author/book graph.
//!
//! # Responsibility
//! - Expose the open/query/mutate/reload contract consumed by the
//!   presentation layer.
//! - Enforce save-then-notify: in-memory state becomes authoritative for
//!   display only after `save` committed.
//!
//! # Invariants
//! - Mutating operations hold the connection for their whole read-diff-save
//!   span; concurrent mutations queue, they never interleave.
//! - The commit hook fires after the transaction committed and after the
//!   connection lock is released.
//! - Adding a title the author already shelved is a persisted no-op.

use crate::db::DbManager;
use crate::model::author::{Author, AuthorId, BookCollection};
use crate::model::book::Book;
use crate::repo::author_repo::{AuthorRepository, SqliteAuthorRepository};
use crate::repo::book_repo::books_of_author;
use crate::repo::change_set::ChangeSet;
use crate::repo::{BookLoad, StoreError, StoreResult};
use std::path::Path;

/// Notification payload emitted after a durable commit.
///
/// Carries exactly what the display surface renders: the trimmed name and
/// the confirmed book count. Dispatching onto a UI context is the
/// subscriber's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    pub author_id: AuthorId,
    pub display_name: String,
    pub book_count: usize,
}

/// Callback invoked after each successful mutating save.
pub type CommitHook = Box<dyn Fn(&CommitEvent) + Send + Sync>;

/// Outcome of [`LibraryService::add_book_to_author`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookWrite {
    /// The title was new; a row was inserted and committed.
    Created(Book),
    /// The title was already on the shelf; nothing was written.
    AlreadyShelved(Book),
}

/// Public persistence contract over one embedded database.
pub struct LibraryService {
    manager: DbManager,
    on_commit: Option<CommitHook>,
}

impl LibraryService {
    /// Opens (and migrates, on first use) the database at `path`.
    ///
    /// A migration failure aborts the open entirely; no store operation is
    /// possible on the returned error path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::new(DbManager::initialize(path)?))
    }

    /// In-memory variant for tests and ephemeral sessions.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(DbManager::initialize_in_memory()?))
    }

    /// Wraps an already-initialized manager (composition-root injection).
    pub fn new(manager: DbManager) -> Self {
        Self {
            manager,
            on_commit: None,
        }
    }

    /// Installs the post-commit notification hook.
    pub fn set_commit_hook(&mut self, hook: CommitHook) {
        self.on_commit = Some(hook);
    }

    /// Looks up an author by natural key with the book collection
    /// eagerly loaded.
    pub fn author_by_name(&self, first: &str, last: &str) -> StoreResult<Option<Author>> {
        let conn = self.manager.lock()?;
        SqliteAuthorRepository::new(&conn).author_by_name(first, last, BookLoad::WithBooks)
    }

    /// Creates and persists a new author with an empty shelf.
    pub fn create_author(&self, first: &str, last: &str) -> StoreResult<Author> {
        let mut changes = ChangeSet::new();
        changes.insert_author(Author::new(first, last))?;

        let saved = {
            let conn = self.manager.lock()?;
            let report = SqliteAuthorRepository::new(&conn).save(&mut changes)?;
            single_author(report.authors)?
        };

        self.notify(&saved);
        Ok(saved)
    }

    /// Appends a book to the author's shelf and persists the whole graph.
    ///
    /// Duplicate titles are a persisted no-op: the existing book is
    /// returned as [`BookWrite::AlreadyShelved`] and no save runs. The
    /// caller's `author` is refreshed to the committed graph on any write.
    pub fn add_book_to_author(&self, author: &mut Author, title: &str) -> StoreResult<BookWrite> {
        let author_id = persisted_id(author)?;

        let saved = {
            let conn = self.manager.lock()?;

            // Materialize the shelf before diffing so an unloaded
            // collection cannot be mistaken for an empty one.
            let shelf = match author.books.as_loaded() {
                Some(books) => books.to_vec(),
                None => books_of_author(&conn, author_id)?,
            };

            if let Some(existing) = shelf.iter().find(|book| book.title == title) {
                let existing = existing.clone();
                author.books = BookCollection::Loaded(shelf);
                return Ok(BookWrite::AlreadyShelved(existing));
            }

            let mut staged = author.clone();
            let mut desired = shelf;
            desired.push(Book::new(title));
            staged.books = BookCollection::Loaded(desired);

            let mut changes = ChangeSet::new();
            changes.update_author(staged)?;
            let report = SqliteAuthorRepository::new(&conn).save(&mut changes)?;
            single_author(report.authors)?
        };

        let created = saved.book_by_title(title).cloned().ok_or_else(|| {
            StoreError::InvalidData(format!("committed graph is missing book `{title}`"))
        })?;
        *author = saved;

        self.notify(author);
        Ok(BookWrite::Created(created))
    }

    /// Deletes every book row owned by the author and empties the
    /// in-memory shelf.
    ///
    /// Returns the number of rows deleted by the commit.
    pub fn clear_books_of_author(&self, author: &mut Author) -> StoreResult<usize> {
        persisted_id(author)?;

        let (saved, deleted) = {
            let conn = self.manager.lock()?;

            let mut staged = author.clone();
            // An explicit empty collection is the delete-intent for every
            // row referencing this owner, loaded or not.
            staged.books = BookCollection::Loaded(Vec::new());

            let mut changes = ChangeSet::new();
            changes.update_author(staged)?;
            let report = SqliteAuthorRepository::new(&conn).save(&mut changes)?;
            (single_author(report.authors)?, report.deleted_books)
        };

        *author = saved;
        self.notify(author);
        Ok(deleted)
    }

    /// Closes and reopens the physical connection without re-running
    /// migrations; picks up externally-made changes.
    pub fn reload(&self) -> StoreResult<()> {
        let mut conn = self.manager.lock()?;
        self.manager.reload_connection(&mut conn)?;
        Ok(())
    }

    fn notify(&self, author: &Author) {
        let (Some(hook), Some(id)) = (self.on_commit.as_ref(), author.id) else {
            return;
        };
        hook(&CommitEvent {
            author_id: id,
            display_name: author.display_name(),
            book_count: author.book_count().unwrap_or(0),
        });
    }
}

fn persisted_id(author: &Author) -> StoreResult<AuthorId> {
    author.id.ok_or_else(|| {
        StoreError::NotFound(format!(
            "author `{}` has no persisted identity",
            author.display_name()
        ))
    })
}

fn single_author(authors: Vec<Author>) -> StoreResult<Author> {
    authors
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::InvalidData("save reported no authors".to_string()))
}
