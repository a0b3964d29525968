// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! The check-in loop: periodic hello to the controller and configuration
//! pull.
//!
//! When the controller announces a `required_config` hash that differs from
//! the hash of the config file on disk, the new file is fetched, written in
//! place, and the process exits cleanly. The external restart wrapper brings
//! the agent back up on the new configuration; in-flight tasks are not
//! joined, their durable effects are already in the store.

use crate::context::AgentContext;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Run the check-in loop forever (or until a config change exits the
/// process). Returns immediately for offline agents.
pub async fn run(ctx: Arc<AgentContext>) {
    let Some(sender) = ctx.sender.clone() else {
        return;
    };

    loop {
        let poll = ctx.poll_time();

        let uri = format!("/core/hello/{}/", sender.client_uuid());
        let reply = match sender.get(&uri).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(error = %err, "error sending check-in message");
                // Walk the endpoint/proxy combinations before the next try.
                sender.refresh(&ctx.config.proxy_list, &ctx.config.controller_list).await;
                tokio::time::sleep(poll).await;
                continue;
            }
        };

        debug!(reply = %reply, "check-in reply from controller");

        let fields: HashMap<String, String> = match serde_json::from_str(&reply) {
            Ok(fields) => fields,
            Err(err) => {
                error!(error = %err, "unable to parse check-in reply");
                tokio::time::sleep(poll).await;
                continue;
            }
        };

        if let Some(required) = fields.get("required_config") {
            if !required.eq_ignore_ascii_case(&ctx.config_hash) {
                info!(
                    have = %ctx.config_hash,
                    need = %required,
                    "new client configuration required"
                );
                if pull_config(&ctx, &sender, required).await {
                    info!("configuration updated, going for shutdown");
                    std::process::exit(0);
                }
            }
        }

        tokio::time::sleep(poll).await;
    }
}

/// Fetch the announced config and overwrite the file on disk. Returns whether
/// the agent should restart.
async fn pull_config(
    ctx: &AgentContext,
    sender: &ghost_comms::Sender,
    required_hash: &str,
) -> bool {
    let bytes = match sender.fetch_resource(required_hash).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(error = %err, "unable to get new configuration file");
            return false;
        }
    };

    if let Err(err) = std::fs::write(&ctx.config_path, bytes) {
        error!(error = %err, "unable to write new configuration file to disk");
        return false;
    }

    true
}
