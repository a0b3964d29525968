// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Tests for the capped message queue

use super::{POP_LIMIT, QUEUE_CAP};
use crate::test_helpers::temp_store;

const URI: &str = "/core/pluginlog/";

#[test]
fn pop_returns_oldest_first() {
    let (store, _dir, _path) = temp_store();
    store.queue_push("first", URI).unwrap();
    store.queue_push("second", URI).unwrap();
    store.queue_push("third", URI).unwrap();

    let entries = store.queue_pop(URI).unwrap();
    let payloads: Vec<&str> = entries.iter().map(|e| e.payload.as_str()).collect();
    assert_eq!(payloads, vec!["first", "second", "third"]);
}

#[test]
fn pop_is_limited_to_one_batch() {
    let (store, _dir, _path) = temp_store();
    for i in 0..150 {
        store.queue_push(&format!("msg-{i}"), URI).unwrap();
    }

    let entries = store.queue_pop(URI).unwrap();
    assert_eq!(entries.len(), POP_LIMIT);
    assert_eq!(entries[0].payload, "msg-0");
    assert_eq!(entries[99].payload, "msg-99");
}

#[test]
fn delete_removes_exactly_the_named_rows() {
    let (store, _dir, _path) = temp_store();
    for i in 0..10 {
        store.queue_push(&format!("msg-{i}"), URI).unwrap();
    }

    let entries = store.queue_pop(URI).unwrap();
    let first_five: Vec<i64> = entries.iter().take(5).map(|e| e.rowid).collect();
    let removed = store.queue_delete(&first_five).unwrap();
    assert_eq!(removed, 5);

    let remaining = store.queue_pop(URI).unwrap();
    assert_eq!(remaining.len(), 5);
    assert_eq!(remaining[0].payload, "msg-5");
}

#[test]
fn delete_with_no_rowids_is_a_no_op() {
    let (store, _dir, _path) = temp_store();
    assert_eq!(store.queue_delete(&[]).unwrap(), 0);
}

#[test]
fn retention_cap_discards_the_oldest() {
    let (store, _dir, _path) = temp_store();
    for i in 0..(QUEUE_CAP + 50) {
        store.queue_push(&format!("msg-{i}"), URI).unwrap();
    }

    assert_eq!(store.queue_len().unwrap(), QUEUE_CAP);

    // The survivors are the newest rows; the first popped entry is the
    // oldest retained one.
    let entries = store.queue_pop(URI).unwrap();
    assert_eq!(entries[0].payload, "msg-50");
}

#[test]
fn vacuum_runs_on_an_emptied_queue() {
    let (store, _dir, _path) = temp_store();
    store.queue_push("only", URI).unwrap();
    let entries = store.queue_pop(URI).unwrap();
    let rowids: Vec<i64> = entries.iter().map(|e| e.rowid).collect();
    store.queue_delete(&rowids).unwrap();
    store.vacuum().unwrap();
    assert_eq!(store.queue_len().unwrap(), 0);
}
