// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Supervisor reconciliation tests (unix: real child processes)

#![cfg(unix)]

use super::*;
use crate::test_helpers::context_at;
use ghost_core::{PluginConfig, PluginMode};

fn persistent_sleep(uuid: &str) -> PluginConfig {
    PluginConfig {
        name: "p1".to_string(),
        uuid: uuid.to_string(),
        mode: PluginMode::Persistent,
        command: "sleep".to_string(),
        args: vec!["60".to_string()],
        ..Default::default()
    }
}

fn ctx_with_plugins(
    dir: &std::path::Path,
    plugins: Vec<PluginConfig>,
) -> Arc<AgentContext> {
    let mut ctx = context_at(dir, true);
    ctx.config.plugins = plugins;
    Arc::new(ctx)
}

#[tokio::test(flavor = "multi_thread")]
async fn persistent_plugin_is_launched_on_first_tick() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_with_plugins(dir.path(), vec![persistent_sleep("uuid-p1")]);

    tick(&ctx).await;

    let record = ctx.store.plugin_get("uuid-p1").unwrap().unwrap();
    assert_eq!(record.status, PluginStatus::Running);
    assert_ne!(record.process_id, 0);
    assert_eq!(record.process_name, "sleep");
    assert_eq!(record.current_manager, ctx.self_pid);
    assert!(is_running(&record));

    sys::kill(record.process_id).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn killed_persistent_plugin_is_relaunched_with_a_new_pid() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_with_plugins(dir.path(), vec![persistent_sleep("uuid-p2")]);

    tick(&ctx).await;
    let first = ctx.store.plugin_get("uuid-p2").unwrap().unwrap();
    let first_pid = first.process_id;

    // Kill the child out from under the agent and wait for the launch task
    // to record the exit.
    sys::kill(first_pid).unwrap();
    for _ in 0..100 {
        let record = ctx.store.plugin_get("uuid-p2").unwrap().unwrap();
        if record.process_id == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    tick(&ctx).await;
    let second = ctx.store.plugin_get("uuid-p2").unwrap().unwrap();
    assert_eq!(second.status, PluginStatus::Running);
    assert_ne!(second.process_id, 0);
    assert_ne!(second.process_id, first_pid);

    sys::kill(second.process_id).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn second_tick_does_not_double_launch() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_with_plugins(dir.path(), vec![persistent_sleep("uuid-p3")]);

    tick(&ctx).await;
    let first = ctx.store.plugin_get("uuid-p3").unwrap().unwrap();

    tick(&ctx).await;
    let second = ctx.store.plugin_get("uuid-p3").unwrap().unwrap();
    assert_eq!(first.process_id, second.process_id);

    sys::kill(second.process_id).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn oneshot_runs_at_most_once() {
    let dir = tempfile::tempdir().unwrap();
    let plugin = PluginConfig {
        name: "once".to_string(),
        uuid: "uuid-once".to_string(),
        mode: PluginMode::Oneshot,
        command: "true".to_string(),
        ..Default::default()
    };
    let ctx = ctx_with_plugins(dir.path(), vec![plugin]);

    tick(&ctx).await;
    // Wait for the terminal status.
    for _ in 0..100 {
        let record = ctx.store.plugin_get("uuid-once").unwrap().unwrap();
        if record.status == PluginStatus::Complete {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let first = ctx.store.plugin_get("uuid-once").unwrap().unwrap();
    assert_eq!(first.status, PluginStatus::Complete);

    tick(&ctx).await;
    let second = ctx.store.plugin_get("uuid-once").unwrap().unwrap();
    // No relaunch: last_start unchanged.
    assert_eq!(first.last_start, second.last_start);
}

#[tokio::test(flavor = "multi_thread")]
async fn deconfigured_running_plugin_is_killed_and_closed_out() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_with_plugins(dir.path(), vec![]);

    // A running record left by some prior agent instance, for a plugin that
    // is no longer in the configuration.
    let mut child = std::process::Command::new("sleep")
        .arg("60")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .unwrap();
    let orphan = PluginRecord {
        uuid: "uuid-gone".to_string(),
        name: "gone".to_string(),
        mode: "persistent".to_string(),
        process_name: "sleep".to_string(),
        process_id: child.id(),
        current_manager: 1,
        status: PluginStatus::Running,
        status_message: "running".to_string(),
        ..Default::default()
    };
    ctx.store.plugin_upsert(&orphan).unwrap();

    tick(&ctx).await;

    let closed = ctx.store.plugin_get("uuid-gone").unwrap().unwrap();
    assert_eq!(closed.status, PluginStatus::Complete);
    assert_eq!(closed.status_message, "removed from configuration");

    // The process was killed.
    let status = child.wait().unwrap();
    assert!(!status.success());
}

#[tokio::test(flavor = "multi_thread")]
async fn garbage_collect_spares_processes_with_a_different_name() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ctx_with_plugins(dir.path(), vec![]);

    let mut child = std::process::Command::new("sleep")
        .arg("60")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .unwrap();
    // The stored name does not match the live executable: the PID was
    // recycled by an unrelated process, so it must not be killed.
    let stale = PluginRecord {
        uuid: "uuid-stale".to_string(),
        name: "stale".to_string(),
        mode: "persistent".to_string(),
        process_name: "some-other-binary".to_string(),
        process_id: child.id(),
        current_manager: 1,
        status: PluginStatus::Running,
        status_message: "running".to_string(),
        ..Default::default()
    };
    ctx.store.plugin_upsert(&stale).unwrap();

    tick(&ctx).await;

    // Record is closed out, process left alone.
    let closed = ctx.store.plugin_get("uuid-stale").unwrap().unwrap();
    assert_eq!(closed.status, PluginStatus::Complete);
    assert_eq!(sys::process_name(child.id()).as_deref(), Some("sleep"));

    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn is_running_rejects_mismatched_records() {
    // Status not running.
    let mut record = PluginRecord {
        uuid: "u".to_string(),
        status: PluginStatus::Complete,
        process_id: std::process::id(),
        process_name: "agent".to_string(),
        ..Default::default()
    };
    assert!(!is_running(&record));

    // Running but no PID.
    record.status = PluginStatus::Running;
    record.process_id = 0;
    assert!(!is_running(&record));

    // Running with a PID whose executable name differs.
    record.process_id = std::process::id();
    record.process_name = "definitely-not-this-test".to_string();
    assert!(!is_running(&record));
}
