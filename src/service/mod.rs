//! Use-case services exposed to presentation callers.
//!
//! # Responsibility
//! - Compose connection management, repositories and change tracking into
//!   the public persistence contract.
//!
//! # Invariants
//! - Services never bypass repository validation/persistence contracts.
//! - Mutations are save-then-notify: the commit hook only fires after a
//!   durable commit.

pub mod library_service;
