//! Read-side queries over book rows.
//!
//! # Responsibility
//! - Materialize an author's owned collection for eager loading.
//! - Expose FK-reference counts used by cascade-delete verification.
//!
//! # Invariants
//! - Rows are returned in insertion (rowid) order; callers treat the
//!   collection as order-irrelevant.

use crate::model::author::AuthorId;
use crate::model::book::Book;
use crate::repo::StoreResult;
use rusqlite::{params, Connection, Row};

const BOOK_SELECT_SQL: &str = "SELECT id, title, author_id FROM books";

/// SQLite-backed book queries.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Returns every book row owned by the given author.
    pub fn books_of_author(&self, author_id: AuthorId) -> StoreResult<Vec<Book>> {
        books_of_author(self.conn, author_id)
    }

    /// Counts book rows whose foreign key references the given author.
    pub fn count_referencing(&self, author_id: AuthorId) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM books WHERE author_id = ?1;",
            params![author_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

pub(crate) fn books_of_author(conn: &Connection, author_id: AuthorId) -> StoreResult<Vec<Book>> {
    let mut stmt = conn.prepare(&format!(
        "{BOOK_SELECT_SQL} WHERE author_id = ?1 ORDER BY id ASC;"
    ))?;

    let mut rows = stmt.query(params![author_id])?;
    let mut books = Vec::new();
    while let Some(row) = rows.next()? {
        books.push(parse_book_row(row)?);
    }
    Ok(books)
}

pub(crate) fn parse_book_row(row: &Row<'_>) -> StoreResult<Book> {
    Ok(Book {
        id: Some(row.get("id")?),
        title: row.get("title")?,
        author_id: Some(row.get("author_id")?),
    })
}
