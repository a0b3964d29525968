// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Host identity collection for first-run initialization.
//!
//! Gathered once, persisted to the key store, and reported to the controller
//! during registration. Identity is best-effort: a host with no resolvable
//! FQDN or no usable interfaces still registers with what it has.

use serde::{Deserialize, Serialize};
use sysinfo::{Networks, System};
use tracing::debug;

/// One network interface with a usable hardware address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub ip: String,
    pub mac: String,
}

/// Identity of the host the agent runs on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostIdentity {
    pub hostname: String,
    pub domain: String,
    pub fqdn: String,
    pub architecture: String,
    pub os_version: String,
    pub interfaces: Vec<InterfaceInfo>,
}

impl HostIdentity {
    /// Collect identity from the live system.
    pub fn collect() -> Self {
        let hostname = System::host_name().unwrap_or_default();
        let os_version = format!(
            "{} ({}) {}",
            System::name().unwrap_or_else(|| "unknown".to_string()),
            System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            System::os_version().unwrap_or_default(),
        );

        let interfaces = collect_interfaces();
        let fqdn = resolve_fqdn(&interfaces).unwrap_or_else(|| {
            debug!(hostname = %hostname, "no FQDN found, using hostname");
            hostname.clone()
        });
        // First label only; the controller reassembles domains server-side.
        let domain = fqdn.split('.').next().unwrap_or_default().to_string();

        Self {
            hostname,
            domain,
            fqdn,
            architecture: std::env::consts::ARCH.to_string(),
            os_version,
            interfaces,
        }
    }
}

/// Enumerate interfaces, skipping those without a real hardware address.
fn collect_interfaces() -> Vec<InterfaceInfo> {
    let networks = Networks::new_with_refreshed_list();
    let mut interfaces = Vec::new();

    for (name, data) in &networks {
        let mac = data.mac_address().to_string();
        if mac.is_empty() || mac.starts_with("00:00:00") {
            continue;
        }
        for ip_network in data.ip_networks() {
            interfaces.push(InterfaceInfo {
                name: name.clone(),
                ip: ip_network.addr.to_string(),
                mac: mac.clone(),
            });
        }
    }

    interfaces
}

/// Reverse-resolve interface addresses until one yields a name.
fn resolve_fqdn(interfaces: &[InterfaceInfo]) -> Option<String> {
    for iface in interfaces {
        let Ok(addr) = iface.ip.parse::<std::net::IpAddr>() else {
            continue;
        };
        match dns_lookup::lookup_addr(&addr) {
            Ok(host) if !host.is_empty() => {
                let fqdn = host.trim_end_matches('.').to_string();
                debug!(fqdn = %fqdn, ip = %iface.ip, "resolved FQDN");
                return Some(fqdn);
            }
            Ok(_) => {}
            Err(err) => debug!(ip = %iface.ip, error = %err, "reverse lookup failed"),
        }
    }
    None
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
