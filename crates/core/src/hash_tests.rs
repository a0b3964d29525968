// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Tests for hashing helpers

use super::*;

// Known digest of the ASCII string "ghost".
const GHOST_SHA256: &str = "ead6ef03d61ee60c533d6d450c50a1e559a8a37f6b796a4094cd0dac6b744428";

#[test]
fn hashes_bytes() {
    assert_eq!(
        sha256_bytes(b""),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn hashes_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample");
    std::fs::write(&path, b"ghost").unwrap();

    let from_file = sha256_file(&path).unwrap();
    assert_eq!(from_file, sha256_bytes(b"ghost"));
    assert_eq!(from_file, GHOST_SHA256);
}

#[test]
fn missing_file_is_an_error() {
    assert!(sha256_file(std::path::Path::new("/nonexistent/file")).is_err());
}
