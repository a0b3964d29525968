// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Persisted plugin lifecycle state.
//!
//! A [`PluginRecord`] is the durable row in the plugins table, keyed by the
//! plugin UUID from the configuration. The same shape, serialized to JSON with
//! `current_manager` scrubbed to zero, is what the agent queues for the
//! controller's pluginlog channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a supervised plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PluginStatus {
    /// Never observed (empty string in storage and on the wire).
    #[default]
    Unknown,
    Running,
    Error,
    Complete,
    /// The plugin exited while a re-attached agent was monitoring it; the
    /// adopter cannot know the real outcome.
    ExitedAfterResume,
}

impl PluginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Running => "running",
            Self::Error => "error",
            Self::Complete => "complete",
            Self::ExitedAfterResume => "exited after monitoring resumed",
        }
    }

    /// Parse the storage representation. Unrecognized text maps to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            "error" => Self::Error,
            "complete" => Self::Complete,
            "exited after monitoring resumed" => Self::ExitedAfterResume,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for PluginStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PluginStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// Durable record of one plugin's lifecycle, keyed by `uuid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginRecord {
    #[serde(rename = "plugin_uuid")]
    pub uuid: String,
    pub name: String,
    pub mode: String,
    pub process_name: String,
    pub process_id: u32,
    /// OS PID of the agent instance that owns the throttler for this plugin.
    /// Scrubbed to zero in outbound telemetry copies.
    #[serde(default, skip_serializing_if = "manager_is_zero")]
    pub current_manager: u32,
    pub status: PluginStatus,
    pub status_message: String,
    pub last_start: DateTime<Utc>,
    pub last_exit: DateTime<Utc>,
}

fn manager_is_zero(manager: &u32) -> bool {
    *manager == 0
}

impl Default for PluginRecord {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            name: String::new(),
            mode: String::new(),
            process_name: String::new(),
            process_id: 0,
            current_manager: 0,
            status: PluginStatus::Unknown,
            status_message: String::new(),
            last_start: DateTime::UNIX_EPOCH,
            last_exit: DateTime::UNIX_EPOCH,
        }
    }
}

impl PluginRecord {
    /// A copy suitable for the pluginlog channel: `current_manager` is never
    /// reported to the controller.
    pub fn scrubbed(&self) -> Self {
        Self { current_manager: 0, ..self.clone() }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
