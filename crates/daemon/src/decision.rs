// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! The supervisor's per-plugin decision.
//!
//! Pure function of the configured plugin, its stored record, and the live
//! process check, so every row of the policy matrix is testable without
//! spawning anything.

use chrono::{DateTime, Duration, Utc};
use ghost_core::{PluginConfig, PluginMode, PluginRecord, PluginStatus};

/// What the supervisor does with one plugin this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start a new child process.
    Launch,
    /// Re-attach management to a child started by a prior agent instance.
    Adopt,
    /// Nothing to do.
    Skip,
}

/// Decide the action for `plugin` given its stored `record`.
///
/// `is_running` is the caller's live check: stored status is `running` AND a
/// process with the recorded PID exists AND its executable name matches.
pub fn decide(
    plugin: &PluginConfig,
    record: &PluginRecord,
    is_running: bool,
    now: DateTime<Utc>,
    self_pid: u32,
) -> Action {
    match plugin.mode {
        PluginMode::Oneshot => match record.status {
            PluginStatus::Unknown => Action::Launch,
            PluginStatus::Error if plugin.retry_failure => Action::Launch,
            _ => Action::Skip,
        },
        PluginMode::Persistent => {
            if !is_running {
                Action::Launch
            } else if record.current_manager != self_pid {
                Action::Adopt
            } else {
                Action::Skip
            }
        }
        PluginMode::Periodic => {
            if !is_running {
                let due = record.last_exit + Duration::seconds(plugin.launch_frequency as i64);
                if now >= due {
                    Action::Launch
                } else {
                    Action::Skip
                }
            } else if record.current_manager != self_pid {
                Action::Adopt
            } else {
                Action::Skip
            }
        }
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
