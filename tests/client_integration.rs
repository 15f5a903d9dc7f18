// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Integration tests for the server client against a mock HTTP server.

use anyhow::Result;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use tether::client::{ClientOptions, RequestError, ServerClient};

/// Client options pointed at a mock server, with near-instant retries.
fn options_for(server: &MockServer) -> ClientOptions {
    ClientOptions {
        port: server.address().port(),
        timeout: Duration::from_secs(5),
        retry_delay: Duration::from_millis(1),
        max_retry_delay: Duration::from_millis(10),
        ..ClientOptions::default()
    }
}

#[tokio::test]
async fn health_reports_version() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/global/health"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "healthy": true, "version": "0.9.1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ServerClient::new(options_for(&server))?;
    let health = client.health().await?;

    assert!(health.healthy);
    assert_eq!(health.version, "0.9.1");
    Ok(())
}

#[tokio::test]
async fn health_without_version_is_invalid_response() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/global/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "healthy": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServerClient::new(options_for(&server))?;
    let result = client.health().await;

    assert!(matches!(result, Err(RequestError::InvalidResponse(_))));
    Ok(())
}

#[tokio::test]
async fn working_directory_requires_directory_field() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/path"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "home": "/home/dev", "state": "/home/dev/.state" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ServerClient::new(options_for(&server))?;
    let result = client.working_directory().await;

    assert!(matches!(result, Err(RequestError::InvalidResponse(_))));
    Ok(())
}

#[tokio::test]
async fn working_directory_parses_full_payload() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/path"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "home": "/home/dev",
            "state": "/home/dev/.local/state",
            "config": "/home/dev/.config",
            "worktree": "/home/dev/proj",
            "directory": "/home/dev/proj"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServerClient::new(options_for(&server))?;
    let wd = client.working_directory().await?;

    assert_eq!(wd.directory, "/home/dev/proj");
    assert_eq!(wd.worktree.as_deref(), Some("/home/dev/proj"));
    Ok(())
}

#[tokio::test]
async fn append_to_prompt_sends_text_and_returns_ack() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tui/append-prompt"))
        .and(body_json(json!({ "text": "fix this" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServerClient::new(options_for(&server))?;
    assert!(client.append_to_prompt("fix this").await?);
    Ok(())
}

#[tokio::test]
async fn client_error_is_not_retried() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/path"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1) // a 4xx must surface immediately
        .mount(&server)
        .await;

    let client = ServerClient::new(options_for(&server))?;
    let result = client.working_directory().await;

    assert!(matches!(result, Err(RequestError::Client { status: 404 })));
    Ok(())
}

#[tokio::test]
async fn not_implemented_is_not_retried() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tui/publish"))
        .respond_with(ResponseTemplate::new(501))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServerClient::new(options_for(&server))?;
    let result = client.publish(json!({ "type": "ping" })).await;

    assert!(matches!(result, Err(RequestError::Server { status: 501 })));
    Ok(())
}

#[tokio::test]
async fn server_error_retries_until_success() -> Result<()> {
    let server = MockServer::start().await;
    let attempts = AtomicU32::new(0);

    Mock::given(method("GET"))
        .and(path("/global/health"))
        .respond_with(move |_: &Request| {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                ResponseTemplate::new(500)
            } else {
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "healthy": true, "version": "0.9.1" }))
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let client = ServerClient::new(options_for(&server))?;
    let health = client.health().await?;

    assert_eq!(health.version, "0.9.1");
    Ok(())
}

#[tokio::test]
async fn server_error_exhausts_retries() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/global/health"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4) // initial attempt + 3 retries
        .mount(&server)
        .await;

    let client = ServerClient::new(options_for(&server))?;
    let result = client.health().await;

    assert!(matches!(result, Err(RequestError::Server { status: 503 })));
    Ok(())
}

#[tokio::test]
async fn unreachable_port_is_unavailable() -> Result<()> {
    // Grab an ephemeral port and free it again.
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let options = ClientOptions {
        port,
        retry_delay: Duration::from_millis(1),
        max_retry_delay: Duration::from_millis(5),
        ..ClientOptions::default()
    };
    let client = ServerClient::new(options)?;
    let result = client.health().await;

    assert!(matches!(result, Err(RequestError::Unavailable(_))));
    Ok(())
}

#[tokio::test]
async fn test_connection_is_single_attempt() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/global/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "healthy": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ServerClient::new(options_for(&server))?;
    assert!(client.test_connection().await);
    Ok(())
}

#[tokio::test]
async fn test_connection_false_on_dead_port() -> Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let client = ServerClient::new(ClientOptions::for_port(port))?;
    assert!(!client.test_connection().await);
    Ok(())
}
