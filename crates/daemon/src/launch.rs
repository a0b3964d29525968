// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! The launch task: one detached task per plugin launch.
//!
//! Verifies resources, spawns the child, records `running`, demotes the
//! process priority, attaches a throttler when configured, then waits out the
//! child's lifetime and records the terminal status. The supervisor blocks
//! on the `launched` rendezvous only until the running record is observable
//! in the store; dropping the sender on an error path releases it just the
//! same.

use crate::context::AgentContext;
use crate::throttle::ThrottleHandle;
use crate::{report, resources, sys};
use ghost_core::{Clock, PluginConfig, PluginStatus};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{error, info};

pub(crate) async fn run(
    ctx: Arc<AgentContext>,
    plugin: PluginConfig,
    launched: oneshot::Sender<()>,
) {
    let mut record = report::record_for(&plugin);

    if !ctx.debug && !resources::verify(&ctx, &plugin).await {
        report::set_error(&ctx, &mut record, "unable to verify hashes");
        return;
    }

    let workdir = ctx.install_dir.join(&plugin.working_directory);
    let mut command = Command::new(&plugin.command);
    command
        .args(&plugin.args)
        .current_dir(&workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            report::set_error(&ctx, &mut record, &format!("unable to start plugin: {err}"));
            return;
        }
    };
    let pid = child.id().unwrap_or(0);

    record.process_name = match sys::process_name(pid) {
        Some(name) => name,
        None => {
            report::set_error(&ctx, &mut record, "unable to get plugin process information");
            return;
        }
    };
    record.status = PluginStatus::Running;
    record.status_message = "running".to_string();
    record.process_id = pid;
    record.last_start = ctx.clock.now_utc();
    record.current_manager = ctx.self_pid;
    report::update_status(&ctx, &record);

    info!(plugin = %plugin.name, uuid = %plugin.uuid, pid, command = %plugin.command, "plugin launched");

    // The launch is observable in the store; the supervisor tick may proceed.
    let _ = launched.send(());

    if let Err(err) = sys::lower_priority(pid) {
        // Can't honor the scheduling contract; don't leave it running hot.
        let _ = sys::kill(pid);
        report::set_error(&ctx, &mut record, &err.to_string());
        return;
    }

    let throttle =
        (plugin.cpu_limit > 0).then(|| ThrottleHandle::spawn(pid, plugin.cpu_limit));

    let outcome = child.wait_with_output().await;

    if let Some(handle) = throttle {
        handle.cancel().await;
    }

    match outcome {
        Ok(output) if output.status.success() => {
            info!(plugin = %plugin.name, uuid = %plugin.uuid, "plugin exited successfully");
            record.status = PluginStatus::Complete;
            record.status_message = "complete".to_string();
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                plugin = %plugin.name,
                uuid = %plugin.uuid,
                status = %output.status,
                "plugin exited with errors"
            );
            record.status = PluginStatus::Error;
            record.status_message = format!("{} : {}", output.status, stderr);
        }
        Err(err) => {
            error!(plugin = %plugin.name, uuid = %plugin.uuid, error = %err, "plugin wait failed");
            record.status = PluginStatus::Error;
            record.status_message = format!("{err} : ");
        }
    }
    record.last_exit = ctx.clock.now_utc();
    // Cleared so the next launch decision starts from a dead record.
    record.process_id = 0;
    report::update_status(&ctx, &record);
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
