// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! System proxy discovery and filtering.
//!
//! Discovered proxies supplement the configured `ProxyList` for connection
//! failover. Both the configured list and the blacklist act as stop-words:
//! a discovered proxy whose address contains any stop-word (case-insensitive)
//! is dropped, so operators can exclude known-broken relays without editing
//! every host's environment.

/// Prefix a bare `host:port` with `http://`.
pub fn normalize(proxy: &str) -> String {
    let lower = proxy.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        proxy.to_string()
    } else {
        format!("http://{proxy}")
    }
}

/// Whether `proxy` contains any stop-word, ignoring case.
pub fn is_excluded(proxy: &str, stop_words: &[String]) -> bool {
    let lower = proxy.to_ascii_lowercase();
    stop_words
        .iter()
        .any(|word| !word.is_empty() && lower.contains(&word.to_ascii_lowercase()))
}

/// Drop excluded entries and anything already present in `existing`.
pub fn filter_discovered(
    found: Vec<String>,
    existing: &[String],
    blacklist: &[String],
) -> Vec<String> {
    let mut stop_words: Vec<String> = existing.to_vec();
    stop_words.extend_from_slice(blacklist);

    found
        .into_iter()
        .filter(|proxy| !is_excluded(proxy, &stop_words))
        .collect()
}

/// Discover proxies from the host environment.
#[cfg(unix)]
pub async fn find_system_proxies() -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    for var in ["http_proxy", "https_proxy", "HTTP_PROXY", "HTTPS_PROXY"] {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                seen.insert(normalize(&value));
            }
        }
    }
    seen.into_iter().collect()
}

/// Discover proxies from per-user Internet Settings and PAC files.
#[cfg(windows)]
pub async fn find_system_proxies() -> Vec<String> {
    use winreg::enums::{HKEY_USERS, KEY_QUERY_VALUE};
    use winreg::RegKey;

    let mut proxies = std::collections::BTreeSet::new();
    let mut pac_urls = std::collections::BTreeSet::new();

    let users = RegKey::predef(HKEY_USERS);
    for user in users.enum_keys().flatten() {
        let path = format!(
            "{user}\\Software\\Microsoft\\Windows\\CurrentVersion\\Internet Settings"
        );
        let Ok(key) = users.open_subkey_with_flags(&path, KEY_QUERY_VALUE) else {
            continue;
        };
        if let Ok(server) = key.get_value::<String, _>("ProxyServer") {
            if !server.is_empty() {
                proxies.insert(server);
            }
        }
        if let Ok(pac) = key.get_value::<String, _>("AutoConfigUrl") {
            if !pac.is_empty() {
                pac_urls.insert(pac);
            }
        }
    }

    // PAC scripts name proxies as `"PROXY host:port"` directives.
    let pattern = match regex::Regex::new(r#""PROXY\s(.*?)""#) {
        Ok(p) => p,
        Err(_) => return proxies.into_iter().map(|p| normalize(&p)).collect(),
    };
    for url in pac_urls {
        let Ok(resp) = reqwest::get(&url).await else {
            continue;
        };
        let Ok(body) = resp.text().await else {
            continue;
        };
        for capture in pattern.captures_iter(&body) {
            if let Some(m) = capture.get(1) {
                let found = m.as_str();
                if !found.is_empty() && !found.eq_ignore_ascii_case("none") {
                    proxies.insert(found.to_string());
                }
            }
        }
    }

    proxies.into_iter().map(|p| normalize(&p)).collect()
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;
