//! SQLite storage bootstrap, schema migration and connection lifecycle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the bookshelf core.
//! - Apply schema migrations in deterministic order before first use.
//! - Own the single physical connection behind [`manager::DbManager`].
//!
//! # Invariants
//! - Applied migration versions are recorded in the `schema_migrations`
//!   history table.
//! - Core code must not read/write application data before migrations
//!   succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod manager;
pub mod migrations;
mod open;

pub use manager::DbManager;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Schema migration failures, always carrying the offending version.
#[derive(Debug)]
pub enum SchemaMigrationError {
    /// A migration step could not be applied; the step's transaction was
    /// rolled back and the file is unchanged from before the step.
    StepFailed {
        version: u32,
        source: rusqlite::Error,
    },
    /// The file records a schema version newer than this binary supports.
    UnsupportedDowngrade {
        db_version: u32,
        latest_supported: u32,
    },
}

impl SchemaMigrationError {
    /// The migration version this failure is attributed to.
    pub fn version(&self) -> u32 {
        match self {
            Self::StepFailed { version, .. } => *version,
            Self::UnsupportedDowngrade { db_version, .. } => *db_version,
        }
    }
}

impl Display for SchemaMigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StepFailed { version, source } => {
                write!(f, "schema migration step {version} failed: {source}")
            }
            Self::UnsupportedDowngrade {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for SchemaMigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StepFailed { source, .. } => Some(source),
            Self::UnsupportedDowngrade { .. } => None,
        }
    }
}

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Migration(SchemaMigrationError),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Migration(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<SchemaMigrationError> for DbError {
    fn from(value: SchemaMigrationError) -> Self {
        Self::Migration(value)
    }
}
