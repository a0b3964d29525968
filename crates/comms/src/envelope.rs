// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! The signed wire envelope.
//!
//! Both directions of the protocol carry the same shape: the inner payload as
//! a JSON string plus a base-64 PKCS#1 v1.5 signature over the payload bytes.

use crate::{crypto, CommsError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

/// Wire envelope: `{"jsonString": ..., "SIGNATURE": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelope {
    #[serde(rename = "jsonString")]
    pub json_string: String,
    #[serde(rename = "SIGNATURE")]
    pub signature: String,
}

impl SignedEnvelope {
    /// Sign `payload` with the client key and wrap it for transmission.
    pub fn seal(key: &RsaPrivateKey, payload: &[u8]) -> Result<Self, CommsError> {
        let signature = crypto::sign(key, payload)?;
        Ok(Self {
            json_string: String::from_utf8_lossy(payload).into_owned(),
            signature: BASE64.encode(signature),
        })
    }

    /// Verify the envelope against the controller's key and return the inner
    /// payload.
    pub fn open(self, server_key: &RsaPublicKey) -> Result<String, CommsError> {
        let signature = BASE64
            .decode(self.signature.as_bytes())
            .map_err(|_| CommsError::Signature)?;
        if !crypto::verify(server_key, self.json_string.as_bytes(), &signature) {
            return Err(CommsError::Signature);
        }
        Ok(self.json_string)
    }

    /// Parse an envelope out of a raw response body.
    pub fn from_body(body: &[u8]) -> Result<Self, CommsError> {
        serde_json::from_slice(body)
            .map_err(|err| CommsError::MalformedResponse(err.to_string()))
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
