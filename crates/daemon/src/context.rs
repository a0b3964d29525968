// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! The root context shared by every agent task.

use ghost_comms::Sender;
use ghost_core::{AgentConfig, SystemClock};
use ghost_storage::Store;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Process-wide state assembled at bootstrap and passed explicitly to each
/// task. `sender` is `None` when the agent runs offline.
pub struct AgentContext {
    pub config: AgentConfig,
    pub store: Store,
    pub sender: Option<Arc<Sender>>,
    pub install_dir: PathBuf,
    pub install_name: String,
    pub config_path: PathBuf,
    pub binary_hash: String,
    pub config_hash: String,
    pub debug: bool,
    pub offline: bool,
    /// This agent instance's PID; recorded as `current_manager` on every
    /// plugin launch or adoption it owns.
    pub self_pid: u32,
    pub clock: SystemClock,
}

impl AgentContext {
    /// The base poll interval with fresh jitter, re-rolled per call so the
    /// communication loops never fall into lockstep across a fleet.
    pub fn poll_time(&self) -> Duration {
        jittered_poll_time(self.config.poll_time)
    }
}

/// Base seconds plus up to one second of random jitter.
pub fn jittered_poll_time(base_secs: u64) -> Duration {
    Duration::from_secs(base_secs) + Duration::from_millis(rand::thread_rng().gen_range(0..1000))
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
