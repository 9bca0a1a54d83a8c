//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations, each step atomic with its history row.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied versions are recorded in the `schema_migrations` table, which
//!   the executor itself creates before any step runs.
//! - A step either fully applies or leaves the file unchanged.

use crate::db::{DbError, DbResult, SchemaMigrationError};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_authors_books.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("0002_indexes.sql"),
    },
];

const HISTORY_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at_epoch_ms INTEGER NOT NULL
);";

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Returns the migration versions recorded as applied against this file.
pub fn applied_versions(conn: &Connection) -> DbResult<Vec<u32>> {
    conn.execute_batch(HISTORY_TABLE_SQL)?;

    let mut stmt = conn.prepare("SELECT version FROM schema_migrations ORDER BY version ASC;")?;
    let mut rows = stmt.query([])?;
    let mut versions = Vec::new();
    while let Some(row) = rows.next()? {
        versions.push(row.get::<_, u32>(0)?);
    }
    Ok(versions)
}

/// Applies all pending migrations on the provided connection.
///
/// Re-invocation on an already-current file is a no-op. Each pending step
/// runs in its own transaction together with its history row, so a failure
/// at step N leaves steps `< N` applied and step N absent.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let applied = applied_versions(conn)?;
    let current_version = applied.last().copied().unwrap_or(0);
    let latest = latest_version();

    if current_version > latest {
        return Err(DbError::Migration(
            SchemaMigrationError::UnsupportedDowngrade {
                db_version: current_version,
                latest_supported: latest,
            },
        ));
    }

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }
        apply_step(conn, migration)?;
    }

    Ok(())
}

fn apply_step(conn: &mut Connection, migration: &Migration) -> DbResult<()> {
    let tx = conn
        .transaction()
        .map_err(|source| step_failed(migration.version, source))?;

    tx.execute_batch(migration.sql)
        .map_err(|source| step_failed(migration.version, source))?;
    tx.execute(
        "INSERT INTO schema_migrations (version, applied_at_epoch_ms)
         VALUES (?1, (strftime('%s', 'now') * 1000));",
        [migration.version],
    )
    .map_err(|source| step_failed(migration.version, source))?;

    tx.commit()
        .map_err(|source| step_failed(migration.version, source))?;
    Ok(())
}

fn step_failed(version: u32, source: rusqlite::Error) -> DbError {
    DbError::Migration(SchemaMigrationError::StepFailed { version, source })
}

#[cfg(test)]
mod tests {
    use super::MIGRATIONS;

    #[test]
    fn registry_versions_are_strictly_increasing() {
        let versions: Vec<u32> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted, "migration versions must be monotonic");
    }
}
