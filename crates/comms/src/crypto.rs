// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! RSA key handling: client keypair generation, payload signing, and
//! controller response verification.
//!
//! Keys are 2048-bit RSA, persisted as PKCS#1 PEM. Signatures are
//! PKCS#1 v1.5 over a SHA-256 digest of the raw payload bytes.

use crate::CommsError;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::pkcs8::DecodePublicKey;
use rsa::sha2::{Digest, Sha256};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

/// Modulus size for generated client keys.
pub const KEY_BITS: usize = 2048;

/// A freshly generated client keypair, PEM-encoded.
pub struct Keypair {
    pub private_pem: String,
    pub public_pem: String,
}

/// Generate a client keypair for first-run initialization.
pub fn generate_keypair() -> Result<Keypair, CommsError> {
    let mut rng = rand::thread_rng();
    let key = RsaPrivateKey::new(&mut rng, KEY_BITS)
        .map_err(|err| CommsError::Key(err.to_string()))?;

    let private_pem = key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|err| CommsError::Key(err.to_string()))?
        .to_string();
    let public_pem = RsaPublicKey::from(&key)
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|err| CommsError::Key(err.to_string()))?;

    Ok(Keypair { private_pem, public_pem })
}

/// Parse a persisted PKCS#1 PEM private key.
pub fn load_private_key(pem: &str) -> Result<RsaPrivateKey, CommsError> {
    RsaPrivateKey::from_pkcs1_pem(pem).map_err(|err| CommsError::Key(err.to_string()))
}

/// Extract the RSA public key embedded in a PEM X.509 certificate.
pub fn server_key_from_certificate(pem: &str) -> Result<RsaPublicKey, CommsError> {
    let (_, parsed) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
        .map_err(|err| CommsError::Certificate(err.to_string()))?;
    let cert = parsed
        .parse_x509()
        .map_err(|err| CommsError::Certificate(err.to_string()))?;
    RsaPublicKey::from_public_key_der(cert.public_key().raw)
        .map_err(|err| CommsError::Certificate(err.to_string()))
}

/// Sign `data` with the client key: PKCS#1 v1.5 over SHA-256.
pub fn sign(key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, CommsError> {
    let digest = Sha256::digest(data);
    key.sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|err| CommsError::Signing(err.to_string()))
}

/// Verify a detached signature over `data`.
pub fn verify(key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> bool {
    let digest = Sha256::digest(data);
    key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature).is_ok()
}

#[cfg(test)]
#[path = "crypto_tests.rs"]
mod tests;
