// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Tests for status reporting

use super::*;
use crate::test_helpers::context_at;
use ghost_core::PluginMode;

fn sample_plugin() -> PluginConfig {
    PluginConfig {
        name: "collector".to_string(),
        uuid: "uuid-report".to_string(),
        mode: PluginMode::Persistent,
        ..Default::default()
    }
}

#[test]
fn update_status_persists_and_queues() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context_at(dir.path(), false);

    let mut record = record_for(&sample_plugin());
    record.status = PluginStatus::Running;
    record.current_manager = ctx.self_pid;
    update_status(&ctx, &record);

    let stored = ctx.store.plugin_get("uuid-report").unwrap().unwrap();
    assert_eq!(stored.status, PluginStatus::Running);
    assert_eq!(stored.current_manager, ctx.self_pid);

    let queued = ctx.store.queue_pop(PLUGINLOG_URI).unwrap();
    assert_eq!(queued.len(), 1);
    let outbound: serde_json::Value = serde_json::from_str(&queued[0].payload).unwrap();
    assert_eq!(outbound["plugin_uuid"], "uuid-report");
    // The telemetry copy never carries the manager PID.
    assert!(outbound.get("current_manager").is_none());
}

#[test]
fn offline_agents_do_not_queue() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context_at(dir.path(), true);

    let record = record_for(&sample_plugin());
    update_status(&ctx, &record);

    assert!(ctx.store.queue_pop(PLUGINLOG_URI).unwrap().is_empty());
    assert!(ctx.store.plugin_get("uuid-report").unwrap().is_some());
}

#[test]
fn set_error_records_a_composed_message() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context_at(dir.path(), false);

    let mut record = record_for(&sample_plugin());
    set_error(&ctx, &mut record, "unable to verify hashes");

    let stored = ctx.store.plugin_get("uuid-report").unwrap().unwrap();
    assert_eq!(stored.status, PluginStatus::Error);
    assert_eq!(
        stored.status_message,
        "Plugin collector(uuid-report): unable to verify hashes"
    );
    assert!(stored.last_exit > chrono::DateTime::UNIX_EPOCH);
}

#[test]
fn record_for_copies_static_identity() {
    let record = record_for(&sample_plugin());
    assert_eq!(record.uuid, "uuid-report");
    assert_eq!(record.name, "collector");
    assert_eq!(record.mode, "persistent");
    assert_eq!(record.status, PluginStatus::Unknown);
}
