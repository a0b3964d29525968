// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Tests for host identity collection

use super::*;

#[test]
fn collect_populates_architecture_and_os() {
    let identity = HostIdentity::collect();
    assert_eq!(identity.architecture, std::env::consts::ARCH);
    assert!(!identity.os_version.is_empty());
}

#[test]
fn domain_is_first_fqdn_label() {
    let identity = HostIdentity {
        fqdn: "host.corp.example.com".to_string(),
        ..Default::default()
    };
    // Recompute the way collect() does.
    let domain = identity.fqdn.split('.').next().unwrap_or_default();
    assert_eq!(domain, "host");
}

#[test]
fn interfaces_serialize_lowercase_keys() {
    let iface = InterfaceInfo {
        name: "eth0".to_string(),
        ip: "10.1.2.3".to_string(),
        mac: "aa:bb:cc:dd:ee:ff".to_string(),
    };
    let json = serde_json::to_value(&iface).unwrap();
    assert_eq!(json["name"], "eth0");
    assert_eq!(json["ip"], "10.1.2.3");
    assert_eq!(json["mac"], "aa:bb:cc:dd:ee:ff");
}
