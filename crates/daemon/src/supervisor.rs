// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! The plugin supervisor: periodic reconciliation of configured plugins
//! against the store and the live process table.
//!
//! Each tick walks the configuration, decides launch/adopt/skip per plugin
//! (see [`crate::decision`]), spawns the work as a detached task, and blocks
//! only until the task signals that the launch or adoption is observable in
//! the store. After the walk, records for plugins that have been removed
//! from the configuration are garbage collected.

use crate::context::AgentContext;
use crate::decision::{decide, Action};
use crate::{adopt, launch, sys};
use ghost_core::{Clock, PluginRecord, PluginStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Reconciliation cadence.
pub const TICK_INTERVAL: Duration = Duration::from_secs(3);

/// Run the supervisor forever.
pub async fn run(ctx: Arc<AgentContext>) {
    loop {
        tick(&ctx).await;
        tokio::time::sleep(TICK_INTERVAL).await;
    }
}

/// One reconciliation pass over the configured plugins.
pub async fn tick(ctx: &Arc<AgentContext>) {
    for plugin in &ctx.config.plugins {
        let record = match ctx.store.plugin_get(&plugin.uuid) {
            Ok(record) => record.unwrap_or_default(),
            Err(err) => {
                error!(uuid = %plugin.uuid, error = %err, "error retrieving plugin record");
                continue;
            }
        };
        let running = is_running(&record);

        match decide(plugin, &record, running, ctx.clock.now_utc(), ctx.self_pid) {
            Action::Launch => {
                info!(plugin = %plugin.name, uuid = %plugin.uuid, "launching plugin");
                let (launched, observable) = oneshot::channel();
                tokio::spawn(launch::run(ctx.clone(), plugin.clone(), launched));
                // Wait until the launch is observable in the store (or the
                // task bailed); otherwise the next tick double-launches.
                let _ = observable.await;
            }
            Action::Adopt => {
                info!(plugin = %plugin.name, uuid = %plugin.uuid, "resuming plugin management");
                let (resumed, observable) = oneshot::channel();
                tokio::spawn(adopt::run(ctx.clone(), plugin.clone(), resumed));
                let _ = observable.await;
            }
            Action::Skip => {}
        }
    }

    garbage_collect(ctx);
}

/// Live check against the stored record: status says running AND the PID
/// exists AND the executable name matches. Any mismatch means not running.
pub(crate) fn is_running(record: &PluginRecord) -> bool {
    if record.status != PluginStatus::Running {
        return false;
    }
    if record.process_id == 0 || record.process_name.is_empty() {
        return false;
    }
    sys::process_name(record.process_id).as_deref() == Some(record.process_name.as_str())
}

/// Kill and close out records whose plugins are gone from the configuration.
fn garbage_collect(ctx: &AgentContext) {
    let running = match ctx.store.plugin_list_by_status(PluginStatus::Running.as_str()) {
        Ok(records) => records,
        Err(err) => {
            error!(error = %err, "unable to list running plugins");
            return;
        }
    };

    for mut record in running {
        if ctx.config.plugins.iter().any(|p| p.uuid == record.uuid) {
            continue;
        }

        // Kill the process named by this record, and only when the live
        // executable name still matches what we stored at launch.
        if record.process_id != 0 {
            if let Some(live_name) = sys::process_name(record.process_id) {
                if live_name == record.process_name {
                    if let Err(err) = sys::kill(record.process_id) {
                        warn!(
                            uuid = %record.uuid,
                            pid = record.process_id,
                            error = %err,
                            "unable to kill deconfigured plugin"
                        );
                    }
                }
            }
        }

        info!(plugin = %record.name, uuid = %record.uuid, "plugin removed from configuration");
        record.status = PluginStatus::Complete;
        record.status_message = "removed from configuration".to_string();
        if let Err(err) = ctx.store.plugin_upsert(&record) {
            error!(uuid = %record.uuid, error = %err, "unable to persist plugin removal");
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
