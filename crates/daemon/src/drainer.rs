// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! The queue drainer: batched delivery of queued telemetry to the controller.
//!
//! Pops up to one batch of the oldest pluginlog messages, POSTs them as a
//! JSON array, and deletes the rows on success. A controller rejection (HTTP
//! 400 or 500) also deletes the rows so one poisoned payload cannot jam the
//! queue forever; any other failure keeps them for the next pass.

use crate::context::AgentContext;
use ghost_comms::CommsError;
use ghost_core::PLUGINLOG_URI;
use ghost_storage::QueueEntry;
use serde_json::value::RawValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Pause after delivering a full batch; there is probably more waiting.
const FULL_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Batch size at which the drainer assumes the queue is still deep.
const FULL_BATCH: usize = 100;

/// How one delivery attempt should be settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Delivered; delete the rows.
    Delivered,
    /// Permanently rejected by the controller; delete the rows anyway.
    Rejected,
    /// Transient failure; keep the rows and retry later.
    Retry,
}

pub(crate) fn classify(result: &Result<String, CommsError>) -> Outcome {
    match result {
        Ok(_) => Outcome::Delivered,
        Err(err) if err.is_status(400) || err.is_status(500) => Outcome::Rejected,
        Err(_) => Outcome::Retry,
    }
}

/// Serialize a batch as a JSON array of the already-serialized records.
pub(crate) fn batch_payload(entries: &[QueueEntry]) -> Result<String, serde_json::Error> {
    let records = entries
        .iter()
        .map(|entry| RawValue::from_string(entry.payload.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    serde_json::to_string(&records)
}

/// Run the drainer forever. Returns immediately for offline agents.
pub async fn run(ctx: Arc<AgentContext>) {
    let Some(sender) = ctx.sender.clone() else {
        return;
    };

    loop {
        let entries = match ctx.store.queue_pop(PLUGINLOG_URI) {
            Ok(entries) => entries,
            Err(err) => {
                error!(error = %err, "error reading message queue");
                tokio::time::sleep(ctx.poll_time()).await;
                continue;
            }
        };

        if entries.is_empty() {
            let _ = ctx.store.vacuum();
            tokio::time::sleep(ctx.poll_time()).await;
            continue;
        }

        let rowids: Vec<i64> = entries.iter().map(|entry| entry.rowid).collect();

        let payload = match batch_payload(&entries) {
            Ok(payload) => payload,
            Err(err) => {
                // An unserializable batch can never deliver; drop it.
                error!(error = %err, "unable to serialize message batch, dropping");
                delete_rows(&ctx, &rowids);
                tokio::time::sleep(ctx.poll_time()).await;
                continue;
            }
        };

        let result = sender.post(payload.as_bytes(), PLUGINLOG_URI).await;
        match classify(&result) {
            Outcome::Delivered => {
                debug!(count = entries.len(), "delivered messages to controller");
                delete_rows(&ctx, &rowids);
            }
            Outcome::Rejected => {
                // Some Result::Err is guaranteed here by classify.
                let err = result.err().map(|e| e.to_string()).unwrap_or_default();
                error!(error = %err, "controller rejected batch, removing from queue");
                delete_rows(&ctx, &rowids);
            }
            Outcome::Retry => {
                let err = result.err().map(|e| e.to_string()).unwrap_or_default();
                debug!(error = %err, "controller unreachable");
            }
        }

        if entries.len() >= FULL_BATCH {
            tokio::time::sleep(FULL_BATCH_DELAY).await;
        } else {
            let _ = ctx.store.vacuum();
            tokio::time::sleep(ctx.poll_time()).await;
        }
    }
}

fn delete_rows(ctx: &AgentContext, rowids: &[i64]) {
    match ctx.store.queue_delete(rowids) {
        Ok(n) => debug!(removed = n, "removed messages from queue"),
        Err(err) => error!(error = %err, "unable to remove messages from queue"),
    }
}

#[cfg(test)]
#[path = "drainer_tests.rs"]
mod tests;
