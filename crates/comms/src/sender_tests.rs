// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Specter Networks LLC

//! Tests for sender URL handling and client construction

use super::*;

#[test]
fn endpoint_joins_with_single_slashes() {
    assert_eq!(
        endpoint("https://c.example.com", "/core/hello/abc/"),
        "https://c.example.com/core/hello/abc/"
    );
    assert_eq!(
        endpoint("https://c.example.com/", "core/conntest"),
        "https://c.example.com/core/conntest/"
    );
}

#[test]
fn endpoint_always_has_trailing_slash() {
    assert!(endpoint("https://c", "core/register").ends_with("/core/register/"));
}

#[test]
fn initial_proxy_is_empty_without_config() {
    assert_eq!(initial_proxy(&[]), "");
}

#[test]
fn initial_proxy_normalizes_first_entry() {
    let list = vec!["corp-proxy:3128".to_string(), "other:1".to_string()];
    assert_eq!(initial_proxy(&list), "http://corp-proxy:3128");
}

#[test]
fn client_builds_without_proxy() {
    assert!(build_client("").is_ok());
    assert!(build_client("none").is_ok());
    assert!(build_client("NONE").is_ok());
}

#[test]
fn client_builds_with_proxy() {
    assert!(build_client("http://proxy.corp:8080").is_ok());
}

#[test]
fn invalid_proxy_url_is_an_error() {
    assert!(build_client("http://[broken").is_err());
}

fn test_sender(controller: &str) -> Sender {
    let key = include_str!("../testdata/controller_key.pem");
    let cert = include_str!("../testdata/controller_cert.pem");
    Sender::new(controller, "", "", key, cert).unwrap()
}

/// Bind-then-drop to get a local port with nothing listening.
async fn dead_controller() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Minimal HTTP responder: every connection gets `body` back as 200 OK.
async fn serve_fixed_body(body: String) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = sock.read(&mut buf).await;
                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn refresh_pins_the_first_working_controller() {
    let dead = dead_controller().await;
    let good = serve_fixed_body(r#"{"status":"success"}"#.to_string()).await;

    let sender = test_sender(&dead);
    assert!(sender.refresh(&[], &[dead.clone(), good]).await);
}

#[tokio::test]
async fn refresh_restores_the_prior_pair_on_total_failure() {
    let dead_a = dead_controller().await;
    let dead_b = dead_controller().await;

    let sender = test_sender(&dead_a);
    assert!(!sender.refresh(&[], &[dead_b]).await);
}

#[tokio::test]
async fn refresh_rejects_controllers_that_answer_without_success() {
    let unhappy = serve_fixed_body(r#"{"status":"error"}"#.to_string()).await;

    let sender = test_sender(&unhappy);
    assert!(!sender.refresh(&[], &[unhappy.clone()]).await);
}

#[tokio::test]
async fn get_verifies_a_signed_response_end_to_end() {
    let key = crate::crypto::load_private_key(include_str!("../testdata/controller_key.pem"))
        .unwrap();
    let inner = r#"{"hello":"agent"}"#;
    let envelope = SignedEnvelope::seal(&key, inner.as_bytes()).unwrap();
    let body = serde_json::to_string(&envelope).unwrap();

    let controller = serve_fixed_body(body).await;
    let sender = test_sender(&controller);

    let reply = sender.get("/core/hello/abc/").await.unwrap();
    assert_eq!(reply, inner);
}

#[tokio::test]
async fn get_rejects_a_response_signed_by_the_wrong_key() {
    // A signature from a freshly generated key must not verify against the
    // pinned certificate.
    let other = crate::crypto::load_private_key(
        &crate::crypto::generate_keypair().unwrap().private_pem,
    )
    .unwrap();
    let envelope = SignedEnvelope::seal(&other, b"{}").unwrap();
    let body = serde_json::to_string(&envelope).unwrap();

    let controller = serve_fixed_body(body).await;
    let sender = test_sender(&controller);

    assert!(matches!(
        sender.get("/core/hello/abc/").await,
        Err(CommsError::Signature)
    ));
}
