//! Staged-change unit of work.
//!
//! # Responsibility
//! - Accumulate insert/update intents for whole author graphs.
//! - Keep staged state intact across failed saves so a retry sees the
//!   same change set.
//!
//! # Invariants
//! - Inserts carry no surrogate key; updates always carry one.
//! - Staging is purely in-memory; nothing touches SQL until `save`.

use crate::model::author::Author;
use crate::repo::{StoreError, StoreResult};

/// One staged whole-graph mutation.
#[derive(Debug, Clone)]
pub enum StagedChange {
    /// A new author (and any loaded books) awaiting insertion.
    Insert(Author),
    /// A persisted author re-attached with its desired collection state.
    Update(Author),
}

/// Ordered set of staged changes flushed by one save transaction.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    staged: Vec<StagedChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a new author for insertion.
    ///
    /// No identity is assigned until save. Staging an author that already
    /// has one is a caller bug and is rejected.
    pub fn insert_author(&mut self, author: Author) -> StoreResult<()> {
        if author.is_persisted() {
            return Err(StoreError::InvalidData(format!(
                "cannot stage insert for already-persisted author id {}",
                author.id.unwrap_or_default()
            )));
        }
        self.staged.push(StagedChange::Insert(author));
        Ok(())
    }

    /// Stages a persisted author for whole-graph re-attach.
    ///
    /// At save time the loaded collection is diffed against the persisted
    /// rows: net-new books are inserted, missing ones deleted, unchanged
    /// ones left alone. An author without an identity has no resolvable
    /// rows to re-attach to.
    pub fn update_author(&mut self, author: Author) -> StoreResult<()> {
        if !author.is_persisted() {
            return Err(StoreError::NotFound(format!(
                "cannot stage update for unpersisted author `{}`",
                author.display_name()
            )));
        }
        self.staged.push(StagedChange::Update(author));
        Ok(())
    }

    pub fn staged(&self) -> &[StagedChange] {
        &self.staged
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Drops all staged changes after a successful flush.
    pub(crate) fn clear(&mut self) {
        self.staged.clear();
    }
}
