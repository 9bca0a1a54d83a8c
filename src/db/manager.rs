//! Process-scoped connection manager.
//!
//! # Responsibility
//! - Own the single physical SQLite connection for the store lifetime.
//! - Guarantee migration runs before any data access (open-time gate).
//! - Serialize access to the shared handle and expose reload semantics.
//!
//! # Invariants
//! - Exactly one manager per store; the composition root calls
//!   `initialize` once and injects the manager, never a global.
//! - `reload` replaces the physical handle without re-running migrations.
//! - Writers queue on the connection lock; overlapping write transactions
//!   are impossible by construction.

use super::open::{open_db, open_db_in_memory, reopen_db};
use super::DbResult;
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, TryLockError};

/// Backing location of the managed connection.
#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Failure to acquire the shared connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// Another operation currently holds the connection and the caller
    /// asked not to wait.
    Busy,
    /// A previous holder panicked mid-operation; the handle state is
    /// suspect until the store is reopened.
    Poisoned,
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "connection is held by another in-flight operation"),
            Self::Poisoned => write!(f, "connection lock was poisoned by a panicked holder"),
        }
    }
}

impl Error for AccessError {}

/// Owner of the single physical connection.
pub struct DbManager {
    location: Location,
    conn: Mutex<Connection>,
}

impl DbManager {
    /// Opens the database file, applies pending migrations, and returns the
    /// manager.
    ///
    /// Migration is a precondition here: no store operation can race an
    /// unfinished migration because no manager exists until it completed.
    /// The original context kept a process-wide "first path wins, once"
    /// flag; this constructor replaces it with an explicit state object the
    /// composition root creates exactly once.
    pub fn initialize(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_db(&path)?;
        info!(
            "event=db_init module=db status=ok mode=file path={}",
            path.display()
        );
        Ok(Self {
            location: Location::File(path),
            conn: Mutex::new(conn),
        })
    }

    /// In-memory variant for tests and ephemeral stores.
    pub fn initialize_in_memory() -> DbResult<Self> {
        let conn = open_db_in_memory()?;
        info!("event=db_init module=db status=ok mode=memory");
        Ok(Self {
            location: Location::Memory,
            conn: Mutex::new(conn),
        })
    }

    /// Acquires the connection, queueing behind any in-flight operation.
    ///
    /// Write transactions opened through the returned guard are serialized
    /// for their whole duration; reads queue the same way because SQLite
    /// shares one handle here.
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>, AccessError> {
        self.conn.lock().map_err(|_| AccessError::Poisoned)
    }

    /// Non-blocking variant of [`lock`](Self::lock); callers that must not
    /// wait behind an in-flight write get `AccessError::Busy` instead.
    ///
    /// The façade itself always queues; this is the reject-instead-of-wait
    /// alternative for display-affinity callers that cannot afford to
    /// block behind a write transaction.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, Connection>, AccessError> {
        self.conn.try_lock().map_err(|err| match err {
            TryLockError::WouldBlock => AccessError::Busy,
            TryLockError::Poisoned(_) => AccessError::Poisoned,
        })
    }

    /// Closes and reopens the physical connection in place.
    ///
    /// Migrations are not re-run; the file was already migrated when the
    /// manager was initialized. In-memory stores have nothing to reopen
    /// (a fresh handle would drop all data), so reload is a no-op there.
    pub fn reload_connection(&self, conn: &mut Connection) -> DbResult<()> {
        match &self.location {
            Location::File(path) => {
                *conn = reopen_db(path)?;
                info!(
                    "event=db_reload module=db status=ok mode=file path={}",
                    path.display()
                );
                Ok(())
            }
            Location::Memory => {
                info!("event=db_reload module=db status=ok mode=memory noop=1");
                Ok(())
            }
        }
    }
}
