// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Plugin lifecycle table.
//!
//! Rows are keyed by the plugin UUID from the configuration; upserts
//! overwrite every non-key column. Timestamps are stored as RFC 3339 text
//! with nanosecond precision.

use crate::{Store, StoreError};
use chrono::{DateTime, SecondsFormat, Utc};
use ghost_core::{PluginRecord, PluginStatus};
use rusqlite::{params, Connection, Row};

fn ensure_table(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS plugins(
            uuid TEXT UNIQUE,
            name TEXT,
            mode TEXT,
            process_name TEXT,
            process_id INTEGER,
            current_manager INTEGER,
            status TEXT,
            status_message TEXT,
            last_exit TEXT,
            last_start TEXT,
            rowid INTEGER PRIMARY KEY ASC)",
        [],
    )?;
    Ok(())
}

fn format_time(when: &DateTime<Utc>) -> String {
    when.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(column: &'static str, value: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp { column, value })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<(PluginRecord, String, String)> {
    let record = PluginRecord {
        uuid: row.get("uuid")?,
        name: row.get("name")?,
        mode: row.get("mode")?,
        process_name: row.get("process_name")?,
        process_id: row.get::<_, i64>("process_id")? as u32,
        current_manager: row.get::<_, i64>("current_manager")? as u32,
        status: PluginStatus::parse(&row.get::<_, String>("status")?),
        status_message: row.get("status_message")?,
        ..PluginRecord::default()
    };
    let last_exit: String = row.get("last_exit")?;
    let last_start: String = row.get("last_start")?;
    Ok((record, last_exit, last_start))
}

fn finish_record(
    (mut record, last_exit, last_start): (PluginRecord, String, String),
) -> Result<PluginRecord, StoreError> {
    record.last_exit = parse_time("last_exit", last_exit)?;
    record.last_start = parse_time("last_start", last_start)?;
    Ok(record)
}

const SELECT_COLUMNS: &str = "uuid, name, mode, process_name, process_id, \
     current_manager, status, status_message, last_exit, last_start";

impl Store {
    /// Upsert a plugin record by UUID.
    pub fn plugin_upsert(&self, record: &PluginRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        conn.execute(
            "UPDATE plugins
                SET name = ?1, mode = ?2, process_name = ?3, status = ?4,
                    status_message = ?5, last_exit = ?6, last_start = ?7,
                    process_id = ?8, current_manager = ?9
              WHERE uuid = ?10",
            params![
                record.name,
                record.mode,
                record.process_name,
                record.status.as_str(),
                record.status_message,
                format_time(&record.last_exit),
                format_time(&record.last_start),
                record.process_id as i64,
                record.current_manager as i64,
                record.uuid,
            ],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO plugins(
                uuid, name, mode, process_name, status, status_message,
                last_exit, last_start, process_id, current_manager)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.uuid,
                record.name,
                record.mode,
                record.process_name,
                record.status.as_str(),
                record.status_message,
                format_time(&record.last_exit),
                format_time(&record.last_start),
                record.process_id as i64,
                record.current_manager as i64,
            ],
        )?;
        Ok(())
    }

    /// Fetch a record by UUID. `None` means the plugin has never been
    /// observed.
    pub fn plugin_get(&self, uuid: &str) -> Result<Option<PluginRecord>, StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        let mut stmt =
            conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM plugins WHERE uuid = ?1"))?;
        let mut rows = stmt.query_map(params![uuid], record_from_row)?;
        match rows.next() {
            Some(raw) => Ok(Some(finish_record(raw?)?)),
            None => Ok(None),
        }
    }

    /// List records whose status contains `substring` (`LIKE %substring%`).
    pub fn plugin_list_by_status(&self, substring: &str) -> Result<Vec<PluginRecord>, StoreError> {
        let conn = self.conn.lock();
        ensure_table(&conn)?;
        let pattern = format!("%{substring}%");
        let mut stmt =
            conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM plugins WHERE status LIKE ?1"))?;
        let raw_rows = stmt
            .query_map(params![pattern], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw_rows.into_iter().map(finish_record).collect()
    }
}

#[cfg(test)]
#[path = "plugins_tests.rs"]
mod tests;
