// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! The controller sender: signed POSTs, verified GETs, and endpoint/proxy
//! failover.
//!
//! All requests serialize on one async mutex so at most one HTTP exchange is
//! in flight at a time. The reqwest client pins the proxy at build time, so
//! changing the active proxy rebuilds the client; endpoint changes only swap
//! the URL prefix.

use crate::{crypto, proxy as proxy_util, CommsError, SignedEnvelope, USER_AGENT};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_REDIRECTS: usize = 10;

/// Signed transport to the controller.
pub struct Sender {
    state: Mutex<SenderState>,
    private_key: RsaPrivateKey,
    server_key: RsaPublicKey,
    client_uuid: parking_lot::Mutex<String>,
}

struct SenderState {
    controller_url: String,
    proxy: String,
    client: reqwest::Client,
}

/// Build the HTTP client for one proxy setting.
///
/// Keep-alives and compression stay off, the request timeout is 120 s, and
/// TLS chain verification is disabled — the response signature is the
/// authentication boundary (see crate docs).
fn build_client(proxy: &str) -> Result<reqwest::Client, CommsError> {
    let mut builder = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(true);

    if proxy.is_empty() || proxy.eq_ignore_ascii_case("none") {
        builder = builder.no_proxy();
    } else {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    builder.build().map_err(CommsError::Network)
}

/// `{controller}/{uri}/` with tidy slashes.
fn endpoint(controller: &str, uri: &str) -> String {
    format!(
        "{}/{}/",
        controller.trim_end_matches('/'),
        uri.trim_matches('/')
    )
}

impl Sender {
    /// Create a sender pinned to an initial controller/proxy pair.
    ///
    /// Fails when the private key or the server certificate cannot be
    /// decoded; both are unrecoverable at startup.
    pub fn new(
        controller_url: &str,
        proxy: &str,
        client_uuid: &str,
        private_key_pem: &str,
        server_certificate_pem: &str,
    ) -> Result<Self, CommsError> {
        let private_key = crypto::load_private_key(private_key_pem)?;
        let server_key = crypto::server_key_from_certificate(server_certificate_pem)?;
        let client = build_client(proxy)?;

        Ok(Self {
            state: Mutex::new(SenderState {
                controller_url: controller_url.trim_end_matches('/').to_string(),
                proxy: proxy.to_string(),
                client,
            }),
            private_key,
            server_key,
            client_uuid: parking_lot::Mutex::new(client_uuid.to_string()),
        })
    }

    /// The registered client UUID, or empty before registration.
    pub fn client_uuid(&self) -> String {
        self.client_uuid.lock().clone()
    }

    /// Record the UUID issued by the controller during registration.
    pub fn set_client_uuid(&self, uuid: &str) {
        *self.client_uuid.lock() = uuid.to_string();
    }

    /// Sign `payload` and POST it to `{controller}/{uri}/`.
    ///
    /// Returns the verified inner payload of the response.
    pub async fn post(&self, payload: &[u8], uri: &str) -> Result<String, CommsError> {
        let state = self.state.lock().await;
        let envelope = SignedEnvelope::seal(&self.private_key, payload)?;
        let body = serde_json::to_string(&envelope)
            .map_err(|err| CommsError::Signing(err.to_string()))?;

        let uuid = self.client_uuid();
        let response = state
            .client
            .post(endpoint(&state.controller_url, uri))
            .header(reqwest::header::CONTENT_TYPE, "application/json;charset=UTF-8")
            .header("client-uuid", if uuid.is_empty() { "none".to_string() } else { uuid })
            .body(body)
            .send()
            .await?;

        self.verified_body(response).await
    }

    /// Unsigned GET of `{controller}/{uri}/`; the response is still expected
    /// to carry a signed envelope.
    pub async fn get(&self, uri: &str) -> Result<String, CommsError> {
        let state = self.state.lock().await;
        let response = state
            .client
            .get(endpoint(&state.controller_url, uri))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        self.verified_body(response).await
    }

    /// Fetch a resource file by SHA-256 and decode its base-64 content.
    pub async fn fetch_resource(&self, sha256: &str) -> Result<Vec<u8>, CommsError> {
        let inner = self.post(b"", &format!("/core/resource/{sha256}/")).await?;
        let fields: HashMap<String, String> = serde_json::from_str(&inner)
            .map_err(|err| CommsError::MalformedResponse(err.to_string()))?;
        let content = fields
            .get("content")
            .ok_or_else(|| CommsError::MalformedResponse("no content field".to_string()))?;
        BASE64
            .decode(content.as_bytes())
            .map_err(|err| CommsError::MalformedResponse(err.to_string()))
    }

    /// Walk controller/proxy combinations until one passes the connection
    /// test, pinning the winner. On total failure the previous pair is
    /// restored and `false` is returned — an untested pair is never left
    /// pinned.
    pub async fn refresh(&self, proxies: &[String], controllers: &[String]) -> bool {
        let mut state = self.state.lock().await;
        let old_controller = state.controller_url.clone();
        let old_proxy = state.proxy.clone();

        for controller in controllers {
            state.controller_url = controller.trim_end_matches('/').to_string();

            // Current proxy first: it was working until a moment ago.
            debug!(controller = %state.controller_url, proxy = %state.proxy, "testing connection");
            if conntest(&state).await {
                info!(controller = %state.controller_url, proxy = %state.proxy, "connection updated");
                return true;
            }

            if !state.proxy.is_empty() && !state.proxy.eq_ignore_ascii_case("none") {
                if set_proxy(&mut state, "").is_ok() {
                    debug!(controller = %state.controller_url, "testing connection without proxy");
                    if conntest(&state).await {
                        info!(controller = %state.controller_url, "connection updated, no proxy");
                        return true;
                    }
                }
            }

            for proxy in proxies {
                if set_proxy(&mut state, proxy).is_err() {
                    continue;
                }
                debug!(controller = %state.controller_url, proxy = %state.proxy, "testing connection");
                if conntest(&state).await {
                    info!(controller = %state.controller_url, proxy = %state.proxy, "connection updated");
                    return true;
                }
            }
        }

        state.controller_url = old_controller;
        let _ = set_proxy(&mut state, &old_proxy);
        false
    }

    async fn verified_body(&self, response: reqwest::Response) -> Result<String, CommsError> {
        let status = response.status();
        let body = response.bytes().await?;
        if status != reqwest::StatusCode::OK {
            return Err(CommsError::Status(status.as_u16()));
        }
        SignedEnvelope::from_body(&body)?.open(&self.server_key)
    }
}

fn set_proxy(state: &mut SenderState, proxy: &str) -> Result<(), CommsError> {
    if state.proxy == proxy {
        return Ok(());
    }
    state.client = build_client(proxy)?;
    state.proxy = proxy.to_string();
    Ok(())
}

/// GET `/core/conntest/` and check for `{"status":"success"}`. The probe is
/// unauthenticated; it only proves the pair can reach a controller.
async fn conntest(state: &SenderState) -> bool {
    let url = endpoint(&state.controller_url, "/core/conntest/");
    let response = match state
        .client
        .get(&url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(err) => {
            debug!(url = %url, error = %err, "conntest network error");
            return false;
        }
    };

    let Ok(body) = response.bytes().await else {
        return false;
    };
    let Ok(fields) = serde_json::from_slice::<HashMap<String, String>>(&body) else {
        debug!(url = %url, "conntest response not deserializable");
        return false;
    };

    fields.get("status").map(String::as_str) == Some("success")
}

/// Normalize a configured proxy entry before first use.
pub fn initial_proxy(proxy_list: &[String]) -> String {
    proxy_list
        .first()
        .map(|p| proxy_util::normalize(p))
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;
