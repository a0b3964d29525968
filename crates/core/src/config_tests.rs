// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Tests for configuration parsing

use super::*;

const FULL_CONFIG: &str = r#"
BinaryHash: abc123
Tags: "region=emea,tier=2"
LogLevel: debug
ControllerList:
  - https://controller-a.example.com
  - https://controller-b.example.com
ProxyList:
  - http://proxy.example.com:8080
ProxyBlackList:
  - badproxy
UseSystemProxies: true
PollTime: 30
ServerCertificate: |
  -----BEGIN CERTIFICATE-----
  MIIB...
  -----END CERTIFICATE-----
Plugins:
  - Name: collector
    Mode: persistent
    UUID: 6f1d6a2e-8a9e-4a3e-9f51-1df3a2b0c001
    WorkingDirectory: collector
    Command: ./collector
    Args: ["--verbose", "-n", "5"]
    CPULimit: 10
    ResourceFiles:
      - Path: collector
        Hash: deadbeef
  - Name: sweep
    Mode: periodic
    LaunchFrequency: 3600
    UUID: 6f1d6a2e-8a9e-4a3e-9f51-1df3a2b0c002
    Command: /usr/bin/sweep
  - Name: setup
    Mode: oneshot
    UUID: 6f1d6a2e-8a9e-4a3e-9f51-1df3a2b0c003
    Command: ./setup.sh
    RetryFailure: true
"#;

#[test]
fn parses_full_config() {
    let cfg: AgentConfig = serde_yaml::from_str(FULL_CONFIG).unwrap();

    assert_eq!(cfg.binary_hash, "abc123");
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(cfg.controller_list.len(), 2);
    assert_eq!(cfg.proxy_list, vec!["http://proxy.example.com:8080"]);
    assert_eq!(cfg.proxy_black_list, vec!["badproxy"]);
    assert!(cfg.use_system_proxies);
    assert_eq!(cfg.poll_time, 30);
    assert_eq!(cfg.plugins.len(), 3);

    let collector = &cfg.plugins[0];
    assert_eq!(collector.name, "collector");
    assert_eq!(collector.mode, PluginMode::Persistent);
    assert_eq!(collector.uuid, "6f1d6a2e-8a9e-4a3e-9f51-1df3a2b0c001");
    assert_eq!(collector.cpu_limit, 10);
    assert_eq!(collector.args, vec!["--verbose", "-n", "5"]);
    assert_eq!(collector.resource_files[0].path, "collector");
    assert_eq!(collector.resource_files[0].hash, "deadbeef");

    let sweep = &cfg.plugins[1];
    assert_eq!(sweep.mode, PluginMode::Periodic);
    assert_eq!(sweep.launch_frequency, 3600);

    let setup = &cfg.plugins[2];
    assert_eq!(setup.mode, PluginMode::Oneshot);
    assert!(setup.retry_failure);
}

#[test]
fn missing_fields_default() {
    let cfg: AgentConfig = serde_yaml::from_str("PollTime: 10").unwrap();
    assert_eq!(cfg.poll_time, 10);
    assert!(cfg.plugins.is_empty());
    assert!(!cfg.use_system_proxies);
    assert!(cfg.binary_hash.is_empty());
}

#[test]
fn plugin_mode_defaults_to_oneshot() {
    let plugin: PluginConfig = serde_yaml::from_str("Name: x\nCommand: ./x").unwrap();
    assert_eq!(plugin.mode, PluginMode::Oneshot);
    assert_eq!(plugin.cpu_limit, 0);
}

#[test]
fn mode_display_matches_wire_strings() {
    assert_eq!(PluginMode::Oneshot.to_string(), "oneshot");
    assert_eq!(PluginMode::Persistent.to_string(), "persistent");
    assert_eq!(PluginMode::Periodic.to_string(), "periodic");
}

#[test]
fn load_reports_missing_file() {
    let err = AgentConfig::load(std::path::Path::new("/nonexistent/ghost.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn load_reports_malformed_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "Plugins: [unterminated").unwrap();
    let err = AgentConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
