// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ghost-comms: signed request/response transport to the controller.
//!
//! Every POST carries an envelope of the serialized payload plus an RSA
//! signature over it; every response (POST or GET) is expected to carry the
//! same envelope shape signed by the controller, verified against the public
//! key embedded in the pinned server certificate. TLS chain verification is
//! deliberately disabled — the application-layer signature is the
//! authentication boundary, and enabling chain checks would break deployed
//! controllers fronted by self-signed listeners.

pub mod crypto;
pub mod envelope;
pub mod proxy;
pub mod sender;

use thiserror::Error;

pub use envelope::SignedEnvelope;
pub use sender::Sender;

/// User-Agent presented on unsigned GET requests.
pub const USER_AGENT: &str = "GHOSTClient/1.0";

/// Transport and crypto failures.
#[derive(Debug, Error)]
pub enum CommsError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The controller answered with a non-200 status.
    #[error("received bad status: {0}")]
    Status(u16),

    #[error("unable to verify response signature")]
    Signature,

    #[error("bad key material: {0}")]
    Key(String),

    #[error("undecodable server certificate: {0}")]
    Certificate(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl CommsError {
    /// Whether this error is an HTTP rejection with the given status code.
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, Self::Status(c) if *c == code)
    }
}
