//! Author repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide natural-key and id lookups with an explicit relation set.
//! - Flush staged change sets in a single transaction, assigning
//!   identities on success.
//!
//! # Invariants
//! - `save` is atomic: on failure the transaction rolls back and the
//!   staged change set is left untouched for retry.
//! - A whole-graph update persists exactly the loaded collection state:
//!   net-new books inserted, net-removed books deleted, unchanged books
//!   untouched.
//! - An `Unloaded` collection never causes book-row mutations.

use crate::model::author::{Author, AuthorId, BookCollection};
use crate::model::book::Book;
use crate::repo::book_repo::books_of_author;
use crate::repo::change_set::{ChangeSet, StagedChange};
use crate::repo::{BookLoad, StoreError, StoreResult};
use log::debug;
use rusqlite::{params, Connection, Transaction};
use std::collections::{HashMap, HashSet};

const AUTHOR_SELECT_SQL: &str = "SELECT id, first_name, last_name FROM authors";

/// Outcome of a successful save.
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    /// Saved author graphs in staging order, with identities assigned.
    pub authors: Vec<Author>,
    pub inserted_books: usize,
    pub updated_books: usize,
    pub deleted_books: usize,
}

/// Repository interface for author persistence and queries.
pub trait AuthorRepository {
    /// Looks up at most one author by (first, last) natural key.
    fn author_by_name(&self, first: &str, last: &str, load: BookLoad)
        -> StoreResult<Option<Author>>;
    /// Looks up one author by surrogate key.
    fn author_by_id(&self, id: AuthorId, load: BookLoad) -> StoreResult<Option<Author>>;
    /// Flushes all staged changes in one transaction.
    fn save(&self, changes: &mut ChangeSet) -> StoreResult<SaveReport>;
}

/// SQLite-backed author repository.
pub struct SqliteAuthorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuthorRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn load_books(&self, author: &mut Author, load: BookLoad) -> StoreResult<()> {
        author.books = match (load, author.id) {
            (BookLoad::WithBooks, Some(id)) => {
                BookCollection::Loaded(books_of_author(self.conn, id)?)
            }
            _ => BookCollection::Unloaded,
        };
        Ok(())
    }
}

impl AuthorRepository for SqliteAuthorRepository<'_> {
    fn author_by_name(
        &self,
        first: &str,
        last: &str,
        load: BookLoad,
    ) -> StoreResult<Option<Author>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AUTHOR_SELECT_SQL} WHERE first_name = ?1 AND last_name = ?2 ORDER BY id ASC LIMIT 1;"
        ))?;

        let mut rows = stmt.query(params![first, last])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut author = Author {
            id: Some(row.get("id")?),
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            books: BookCollection::Unloaded,
        };
        self.load_books(&mut author, load)?;
        Ok(Some(author))
    }

    fn author_by_id(&self, id: AuthorId, load: BookLoad) -> StoreResult<Option<Author>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{AUTHOR_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query(params![id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut author = Author {
            id: Some(row.get("id")?),
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            books: BookCollection::Unloaded,
        };
        self.load_books(&mut author, load)?;
        Ok(Some(author))
    }

    fn save(&self, changes: &mut ChangeSet) -> StoreResult<SaveReport> {
        if changes.is_empty() {
            return Ok(SaveReport::default());
        }

        // Single shared handle; the connection manager already serializes
        // access, so an unchecked transaction cannot overlap another.
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(StoreError::Persistence)?;

        let mut report = SaveReport::default();
        for change in changes.staged() {
            let saved = match change {
                StagedChange::Insert(author) => insert_author_graph(&tx, author, &mut report)?,
                StagedChange::Update(author) => update_author_graph(&tx, author, &mut report)?,
            };
            report.authors.push(saved);
        }

        tx.commit().map_err(StoreError::Persistence)?;
        changes.clear();

        debug!(
            "event=store_save module=repo status=ok authors={} inserted_books={} updated_books={} deleted_books={}",
            report.authors.len(),
            report.inserted_books,
            report.updated_books,
            report.deleted_books
        );
        Ok(report)
    }
}

fn insert_author_graph(
    tx: &Transaction<'_>,
    author: &Author,
    report: &mut SaveReport,
) -> StoreResult<Author> {
    author.validate()?;

    tx.execute(
        "INSERT INTO authors (first_name, last_name) VALUES (?1, ?2);",
        params![author.first_name, author.last_name],
    )
    .map_err(StoreError::Persistence)?;
    let author_id = tx.last_insert_rowid();

    let mut saved = author.clone();
    saved.id = Some(author_id);
    if let Some(books) = saved.books.as_loaded_mut() {
        for book in books {
            let book_id = insert_book_row(tx, author_id, &book.title)?;
            book.id = Some(book_id);
            book.author_id = Some(author_id);
            report.inserted_books += 1;
        }
    }
    Ok(saved)
}

fn update_author_graph(
    tx: &Transaction<'_>,
    author: &Author,
    report: &mut SaveReport,
) -> StoreResult<Author> {
    author.validate()?;
    let author_id = author.id.ok_or_else(|| {
        StoreError::NotFound(format!(
            "author `{}` has no persisted identity",
            author.display_name()
        ))
    })?;

    let changed = tx
        .execute(
            "UPDATE authors SET first_name = ?1, last_name = ?2 WHERE id = ?3;",
            params![author.first_name, author.last_name, author_id],
        )
        .map_err(StoreError::Persistence)?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!(
            "author row {author_id} does not exist"
        )));
    }

    let mut saved = author.clone();
    match &mut saved.books {
        // Relation was never materialized; book rows are not ours to touch.
        BookCollection::Unloaded => {}
        BookCollection::Loaded(desired) => {
            sync_owned_collection(tx, author_id, desired, report)?;
        }
    }
    Ok(saved)
}

/// Persists exactly the loaded collection state: net-new books inserted,
/// net-removed books deleted, title changes updated, the rest untouched.
fn sync_owned_collection(
    tx: &Transaction<'_>,
    author_id: AuthorId,
    desired: &mut Vec<Book>,
    report: &mut SaveReport,
) -> StoreResult<()> {
    let existing = books_of_author(tx, author_id).map_err(into_persistence)?;
    let existing_by_id: HashMap<i64, &str> = existing
        .iter()
        .filter_map(|book| book.id.map(|id| (id, book.title.as_str())))
        .collect();
    let kept: HashSet<i64> = desired.iter().filter_map(|book| book.id).collect();

    // Removal from the collection is a delete-intent for owned children.
    for book in &existing {
        let Some(book_id) = book.id else { continue };
        if !kept.contains(&book_id) {
            tx.execute("DELETE FROM books WHERE id = ?1;", params![book_id])
                .map_err(StoreError::Persistence)?;
            report.deleted_books += 1;
        }
    }

    for book in desired {
        match book.id {
            None => {
                let book_id = insert_book_row(tx, author_id, &book.title)?;
                book.id = Some(book_id);
                book.author_id = Some(author_id);
                report.inserted_books += 1;
            }
            Some(book_id) => match existing_by_id.get(&book_id) {
                None => {
                    return Err(StoreError::NotFound(format!(
                        "book row {book_id} does not belong to author row {author_id}"
                    )));
                }
                Some(title) if *title != book.title => {
                    tx.execute(
                        "UPDATE books SET title = ?1 WHERE id = ?2;",
                        params![book.title, book_id],
                    )
                    .map_err(StoreError::Persistence)?;
                    book.author_id = Some(author_id);
                    report.updated_books += 1;
                }
                Some(_) => {
                    book.author_id = Some(author_id);
                }
            },
        }
    }

    Ok(())
}

fn insert_book_row(tx: &Transaction<'_>, author_id: AuthorId, title: &str) -> StoreResult<i64> {
    tx.execute(
        "INSERT INTO books (title, author_id) VALUES (?1, ?2);",
        params![title, author_id],
    )
    .map_err(StoreError::Persistence)?;
    Ok(tx.last_insert_rowid())
}

/// Reads performed inside a save transaction fail the save as a whole.
fn into_persistence(err: StoreError) -> StoreError {
    match err {
        StoreError::Db(crate::db::DbError::Sqlite(source)) => StoreError::Persistence(source),
        other => other,
    }
}
