// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Plugin status reporting: every durable status write is mirrored to the
//! controller by queuing a pluginlog copy with `current_manager` scrubbed.

use crate::context::AgentContext;
use ghost_core::{Clock, PluginConfig, PluginRecord, PluginStatus, PLUGINLOG_URI};
use tracing::error;

/// Fresh record carrying the static identity of a configured plugin.
pub(crate) fn record_for(plugin: &PluginConfig) -> PluginRecord {
    PluginRecord {
        uuid: plugin.uuid.clone(),
        name: plugin.name.clone(),
        mode: plugin.mode.to_string(),
        ..PluginRecord::default()
    }
}

/// Persist the record and queue its telemetry copy. Store failures are logged
/// and skipped; the next status change writes again.
pub(crate) fn update_status(ctx: &AgentContext, record: &PluginRecord) {
    if let Err(err) = ctx.store.plugin_upsert(record) {
        error!(uuid = %record.uuid, error = %err, "unable to persist plugin status");
    }
    queue_plugin_log(ctx, record);
}

/// Queue a telemetry copy only (no table write). Offline agents keep nothing.
pub(crate) fn queue_plugin_log(ctx: &AgentContext, record: &PluginRecord) {
    if ctx.offline {
        return;
    }
    match serde_json::to_string(&record.scrubbed()) {
        Ok(json) => {
            if let Err(err) = ctx.store.queue_push(&json, PLUGINLOG_URI) {
                error!(uuid = %record.uuid, error = %err, "unable to queue plugin log");
            }
        }
        Err(err) => error!(uuid = %record.uuid, error = %err, "unable to serialize plugin log"),
    }
}

/// Mark the record failed with a composed message and report it.
pub(crate) fn set_error(ctx: &AgentContext, record: &mut PluginRecord, message: &str) {
    let full = format!("Plugin {}({}): {}", record.name, record.uuid, message);
    error!(plugin = %record.name, uuid = %record.uuid, "{message}");
    record.status = PluginStatus::Error;
    record.status_message = full;
    record.last_exit = ctx.clock.now_utc();
    update_status(ctx, record);
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
