// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Agent configuration file parsing.
//!
//! The configuration is a YAML document with PascalCase keys, delivered by the
//! controller and replaced wholesale when the check-in loop detects a new
//! required config hash.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading the agent configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AgentConfig {
    pub binary_hash: String,
    pub tags: String,
    pub log_level: String,
    pub controller_list: Vec<String>,
    pub proxy_list: Vec<String>,
    pub proxy_black_list: Vec<String>,
    pub use_system_proxies: bool,
    /// Base sleep between outbound communication attempts, in seconds.
    /// Jitter of up to one second is added by the communication loops.
    pub poll_time: u64,
    /// PEM-encoded controller certificate whose embedded public key verifies
    /// response signatures.
    pub server_certificate: String,
    pub plugins: Vec<PluginConfig>,
}

impl AgentConfig {
    /// Load and parse the YAML configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Execution policy for a supervised plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginMode {
    /// Launch once; retry only on error when `retry_failure` is set.
    #[default]
    Oneshot,
    /// Keep running; relaunch whenever the process is not alive.
    Persistent,
    /// Relaunch `launch_frequency` seconds after the last exit.
    Periodic,
}

impl fmt::Display for PluginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oneshot => write!(f, "oneshot"),
            Self::Persistent => write!(f, "persistent"),
            Self::Periodic => write!(f, "periodic"),
        }
    }
}

/// Static definition of one supervised plugin.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PluginConfig {
    pub name: String,
    pub mode: PluginMode,
    /// Seconds between launches; periodic mode only.
    pub launch_frequency: u64,
    #[serde(rename = "UUID")]
    pub uuid: String,
    /// Relative to the install directory.
    pub working_directory: String,
    pub command: String,
    pub args: Vec<String>,
    pub resource_files: Vec<ResourceFile>,
    /// Target CPU percentage; 0 disables throttling.
    #[serde(rename = "CPULimit")]
    pub cpu_limit: u64,
    /// One-shot mode only: relaunch after a failed run.
    pub retry_failure: bool,
}

/// A file the plugin needs on disk, pinned by SHA-256.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResourceFile {
    /// Relative to the plugin working directory.
    pub path: String,
    pub hash: String,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
