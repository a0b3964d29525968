// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Shared fixtures for daemon tests

use crate::context::AgentContext;
use ghost_core::{AgentConfig, SystemClock};
use ghost_storage::Store;
use std::path::Path;

/// A context over a fresh store in `dir`. `offline` controls whether status
/// updates queue telemetry; no sender is attached either way.
pub(crate) fn context_at(dir: &Path, offline: bool) -> AgentContext {
    let store = Store::open(&dir.join("ghost.db")).unwrap();
    AgentContext {
        config: AgentConfig { poll_time: 1, ..AgentConfig::default() },
        store,
        sender: None,
        install_dir: dir.to_path_buf(),
        install_name: "agent".to_string(),
        config_path: dir.join("config.yaml"),
        binary_hash: "test-binary-hash".to_string(),
        config_hash: "test-config-hash".to_string(),
        debug: false,
        offline,
        self_pid: std::process::id(),
        clock: SystemClock,
    }
}
