// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! String key/value registry for agent identity and key material.

use crate::{Store, StoreError};
use rusqlite::{params, Connection, OptionalExtension};

fn ensure_table(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS key_store(
            key TEXT UNIQUE,
            data TEXT,
            rowid INTEGER PRIMARY KEY ASC)",
        [],
    )?;
    Ok(())
}

impl Store {
    /// Upsert a key/value pair.
    pub fn kv_put(&self, key: &str, data: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        conn.execute("UPDATE key_store SET data = ?1 WHERE key = ?2", params![data, key])?;
        conn.execute(
            "INSERT OR IGNORE INTO key_store(key, data) VALUES (?1, ?2)",
            params![key, data],
        )?;
        Ok(())
    }

    /// Look up a key. A missing key is `None`, not an error.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        let data = conn
            .query_row("SELECT data FROM key_store WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(data)
    }

    /// Remove one key. Returns whether a row was actually deleted.
    pub fn kv_delete(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        let n = conn.execute("DELETE FROM key_store WHERE key = ?1", params![key])?;
        Ok(n == 1)
    }

    /// Remove every key containing `subkey`. Returns the number of rows
    /// removed.
    pub fn kv_delete_matching(&self, subkey: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        let pattern = format!("%{subkey}%");
        let n = conn.execute("DELETE FROM key_store WHERE key LIKE ?1", params![pattern])?;
        Ok(n)
    }

    /// List keys beginning with `prefix`.
    pub fn kv_subkeys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        let pattern = format!("{prefix}%");
        let mut stmt = conn.prepare("SELECT key FROM key_store WHERE key LIKE ?1")?;
        let keys = stmt
            .query_map(params![pattern], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
#[path = "keystore_tests.rs"]
mod tests;
