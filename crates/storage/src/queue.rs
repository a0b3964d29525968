// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Capped outbound message queue.
//!
//! Producers append serialized payloads tagged with a controller URI; the
//! queue drainer pops the oldest rows and deletes them once delivered (or
//! permanently rejected). A deletion trigger keeps the newest 20,000 rows:
//! on every insert, anything at or older than the 20,001st-newest row is
//! discarded, so a long offline stretch cannot grow the database unbounded.

use crate::{Store, StoreError};
use rusqlite::{params, params_from_iter, Connection};

/// Maximum number of retained queue rows.
pub const QUEUE_CAP: usize = 20_000;

/// Maximum rows returned by one pop.
pub const POP_LIMIT: usize = 100;

/// One queued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub rowid: i64,
    pub payload: String,
}

fn ensure_table(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS message_queue(
            post_string TEXT,
            post_uri TEXT,
            rowid INTEGER PRIMARY KEY ASC)",
        [],
    )?;
    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS rolling_queue AFTER INSERT ON message_queue
         BEGIN
            DELETE FROM message_queue WHERE rowid <=
                (SELECT rowid FROM message_queue ORDER BY rowid DESC LIMIT 20000, 1);
         END",
        [],
    )?;
    Ok(())
}

impl Store {
    /// Append a message for later delivery. Retention is enforced by the
    /// rolling trigger; the oldest rows are discarded once the cap is hit.
    pub fn queue_push(&self, post_string: &str, post_uri: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        conn.execute(
            "INSERT INTO message_queue(post_string, post_uri) VALUES (?1, ?2)",
            params![post_string, post_uri],
        )?;
        Ok(())
    }

    /// Pop up to [`POP_LIMIT`] of the oldest queued messages.
    ///
    /// The `uri` argument names the logical channel but does not filter the
    /// query: every producer in this agent posts to the pluginlog channel, so
    /// all rows drain through the single caller. (Matches the deployed
    /// behavior; a per-URI filter would change which rows a drain removes.)
    pub fn queue_pop(&self, _uri: &str) -> Result<Vec<QueueEntry>, StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        let mut stmt = conn.prepare(
            "SELECT rowid, post_string FROM message_queue ORDER BY rowid ASC LIMIT 100",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(QueueEntry { rowid: row.get(0)?, payload: row.get(1)? })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Delete exactly the named rows. Returns the number removed.
    pub fn queue_delete(&self, rowids: &[i64]) -> Result<usize, StoreError> {
        if rowids.is_empty() {
            return Ok(0);
        }
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        let placeholders = vec!["?"; rowids.len()].join(",");
        let sql = format!("DELETE FROM message_queue WHERE rowid IN ({placeholders})");
        let n = conn.execute(&sql, params_from_iter(rowids.iter()))?;
        Ok(n)
    }

    /// Number of rows currently queued.
    pub fn queue_len(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        let n: i64 =
            conn.query_row("SELECT COUNT(*) FROM message_queue", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
