// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ghost-storage: the agent's durable single-file store.
//!
//! One SQLite database (`ghost.db` beside the binary) holds three logical
//! tables: a string key/value registry for agent identity, the plugin
//! lifecycle table, and the capped outbound message queue. Tables are created
//! lazily the first time an operation touches them, so a fresh database file
//! is valid from the moment it is opened.
//!
//! Every operation serializes on an internal mutex; callers on any task see
//! one statement at a time against a consistent snapshot.

mod keystore;
mod plugins;
mod queue;

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

pub use queue::QueueEntry;

/// Storage errors. All operations report failures to the caller; nothing in
/// this crate panics on a bad row.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("unparsable timestamp in column {column}: {value:?}")]
    InvalidTimestamp { column: &'static str, value: String },
}

/// Handle to the agent's local database.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path`. A database that cannot be
    /// opened is unrecoverable for the agent; callers treat this as fatal.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Reclaim free pages. Called by the queue drainer when the queue runs
    /// empty or after a short drain.
    pub fn vacuum(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch("VACUUM;")?;
        Ok(())
    }
}
