// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! The adopt task: re-attach management to a plugin process started by a
//! prior agent instance.
//!
//! Adoption has no child handle to wait on, so it polls the stored record
//! against the live process table. It deliberately never writes a terminal
//! status or clears the PID: the supervisor may already have relaunched the
//! plugin by the time the adopted process exits, and overwriting the fresh
//! record would trigger a double launch.

use crate::context::AgentContext;
use crate::throttle::ThrottleHandle;
use crate::{report, supervisor, sys};
use ghost_core::{Clock, PluginConfig, PluginStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// How often the adopter re-reads the record and the process table.
/// Shortened under test so exit detection is observable without a 30 s wait.
const POLL_INTERVAL: Duration = if cfg!(test) {
    Duration::from_millis(50)
} else {
    Duration::from_secs(30)
};

pub(crate) async fn run(
    ctx: Arc<AgentContext>,
    plugin: PluginConfig,
    resumed: oneshot::Sender<()>,
) {
    let mut record = match ctx.store.plugin_get(&plugin.uuid) {
        Ok(Some(record)) => record,
        Ok(None) => {
            warn!(uuid = %plugin.uuid, "no stored record to adopt");
            return;
        }
        Err(err) => {
            error!(uuid = %plugin.uuid, error = %err, "unable to load record for adoption");
            return;
        }
    };

    // The decision to adopt was made against a live PID; pin it, because the
    // record may change under us once the supervisor starts relaunching.
    let adopted_pid = record.process_id;

    record.process_name = match sys::process_name(adopted_pid) {
        Some(name) => name,
        None => {
            report::set_error(&ctx, &mut record, "unable to get plugin process information");
            return;
        }
    };
    record.status = PluginStatus::Running;
    record.status_message = "resuming control".to_string();
    record.current_manager = ctx.self_pid;
    report::update_status(&ctx, &record);

    // The prior agent may have died between a throttler's suspend and resume,
    // leaving the child frozen; one unconditional resume un-wedges it.
    let _ = sys::resume(adopted_pid);

    let _ = resumed.send(());

    let throttle =
        (plugin.cpu_limit > 0).then(|| ThrottleHandle::spawn(adopted_pid, plugin.cpu_limit));

    loop {
        match ctx.store.plugin_get(&plugin.uuid) {
            Ok(Some(current)) => {
                // A changed PID means a fresh launch superseded this adoption.
                let ours = supervisor::is_running(&current) && current.process_id == adopted_pid;
                record = current;
                if !ours {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                error!(uuid = %plugin.uuid, error = %err, "unable to reload record while adopting");
                break;
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    if let Some(handle) = throttle {
        handle.cancel().await;
    }

    info!(
        plugin = %plugin.name,
        uuid = %plugin.uuid,
        pid = adopted_pid,
        "detected exit of previously adopted plugin"
    );

    // Telemetry only. The terminal outcome is unknowable from here, and the
    // stored record may already describe a relaunched process.
    record.status = PluginStatus::ExitedAfterResume;
    record.status_message = "exited after monitoring resumed".to_string();
    record.last_exit = ctx.clock.now_utc();
    report::queue_plugin_log(&ctx, &record);
}

#[cfg(test)]
#[path = "adopt_tests.rs"]
mod tests;
