// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Typed HTTP client for one server instance.
//!
//! The wire protocol is fixed by the server: a health endpoint, a
//! working-directory query, and a set of boolean-acknowledged TUI endpoints.
//! Requests retry with exponential backoff for failures classified as
//! retryable; [`ServerClient::test_connection`] deliberately bypasses all of
//! that for sub-second liveness checks.

/// Request error classification.
pub mod error;
/// Backoff and jitter math.
pub mod retry;

pub use error::RequestError;

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Well-known default server port.
pub const DEFAULT_PORT: u16 = 4096;

/// Timeout for the single-attempt liveness check.
const TEST_CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport configuration for a [`ServerClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Server host. Always loopback in practice.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after the initial attempt, for retryable failures only.
    pub max_retries: u32,
    /// Base backoff delay; doubles per attempt.
    pub retry_delay: Duration,
    /// Backoff cap.
    pub max_retry_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            max_retry_delay: Duration::from_secs(10),
        }
    }
}

impl ClientOptions {
    /// Default options bound to `port`.
    #[must_use]
    pub fn for_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Short-timeout, no-retry options for throwaway verification clients
    /// used during discovery. Burning seconds of backoff on a candidate that
    /// turns out to serve the wrong project would stall the whole cascade.
    #[must_use]
    pub fn quick_probe(port: u16) -> Self {
        Self {
            port,
            timeout: TEST_CONNECTION_TIMEOUT,
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Server health report.
#[derive(Debug, Clone)]
pub struct Health {
    /// Whether the server reports itself healthy.
    pub healthy: bool,
    /// Server version string.
    pub version: String,
}

/// The directory layout one server instance reports serving. Fetched live for
/// every check; never cached.
#[derive(Debug, Clone)]
pub struct WorkingDirectory {
    /// The project directory being served. Load-bearing for matching.
    pub directory: String,
    /// User home directory, as the server sees it.
    pub home: Option<String>,
    /// Server state directory.
    pub state: Option<String>,
    /// Server config directory.
    pub config: Option<String>,
    /// Git worktree root, when the project is inside one.
    pub worktree: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHealth {
    #[serde(default)]
    healthy: bool,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPath {
    directory: Option<String>,
    home: Option<String>,
    state: Option<String>,
    config: Option<String>,
    worktree: Option<String>,
}

/// HTTP client bound to one server endpoint.
///
/// Dropping the client releases its connection pool; the lifecycle manager
/// relies on that when it replaces the current binding.
pub struct ServerClient {
    http: reqwest::Client,
    base_url: String,
    options: ClientOptions,
}

impl ServerClient {
    /// Creates a client from transport options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be constructed.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP transport")?;

        let base_url = format!("http://{}:{}", options.host, options.port);

        Ok(Self {
            http,
            base_url,
            options,
        })
    }

    /// The port this client is bound to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.options.port
    }

    /// The endpoint this client targets, e.g. `http://127.0.0.1:4096`.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    /// Fetches the server health report.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidResponse`] if the payload lacks a
    /// version, or the classified transport/status error otherwise.
    pub async fn health(&self) -> Result<Health, RequestError> {
        let value = self.request(Method::GET, "/global/health", None).await?;
        let raw: RawHealth = serde_json::from_value(value)
            .map_err(|e| RequestError::InvalidResponse(e.to_string()))?;

        let version = raw.version.ok_or_else(|| {
            RequestError::InvalidResponse("health response missing version".to_string())
        })?;

        Ok(Health {
            healthy: raw.healthy,
            version,
        })
    }

    /// Fetches the directory layout this server instance serves.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidResponse`] if the payload lacks a
    /// directory, or the classified transport/status error otherwise.
    pub async fn working_directory(&self) -> Result<WorkingDirectory, RequestError> {
        let value = self.request(Method::GET, "/path", None).await?;
        let raw: RawPath = serde_json::from_value(value)
            .map_err(|e| RequestError::InvalidResponse(e.to_string()))?;

        let directory = raw.directory.ok_or_else(|| {
            RequestError::InvalidResponse("path response missing directory".to_string())
        })?;

        Ok(WorkingDirectory {
            directory,
            home: raw.home,
            state: raw.state,
            config: raw.config,
            worktree: raw.worktree,
        })
    }

    /// Appends text to the server's prompt input.
    ///
    /// # Errors
    ///
    /// Returns the classified request error on failure.
    pub async fn append_to_prompt(&self, text: &str) -> Result<bool, RequestError> {
        self.post_ack("/tui/append-prompt", json!({ "text": text }))
            .await
    }

    /// Runs a TUI command on the server.
    ///
    /// # Errors
    ///
    /// Returns the classified request error on failure.
    pub async fn execute_command(&self, command: &str) -> Result<bool, RequestError> {
        self.post_ack("/tui/execute-command", json!({ "command": command }))
            .await
    }

    /// Switches the server's active session.
    ///
    /// # Errors
    ///
    /// Returns the classified request error on failure.
    pub async fn select_session(&self, session_id: &str) -> Result<bool, RequestError> {
        self.post_ack("/tui/select-session", json!({ "sessionID": session_id }))
            .await
    }

    /// Submits whatever is currently in the server's prompt input.
    ///
    /// # Errors
    ///
    /// Returns the classified request error on failure.
    pub async fn submit_prompt(&self) -> Result<bool, RequestError> {
        self.post_ack("/tui/submit-prompt", json!({})).await
    }

    /// Clears the server's prompt input.
    ///
    /// # Errors
    ///
    /// Returns the classified request error on failure.
    pub async fn clear_prompt(&self) -> Result<bool, RequestError> {
        self.post_ack("/tui/clear-prompt", json!({})).await
    }

    /// Publishes a raw event to the server's TUI bus.
    ///
    /// # Errors
    ///
    /// Returns the classified request error on failure.
    pub async fn publish(&self, payload: Value) -> Result<bool, RequestError> {
        self.post_ack("/tui/publish", payload).await
    }

    /// Fast single-attempt liveness check.
    ///
    /// Bypasses the retry policy entirely with a fixed short timeout: this is
    /// called on user-facing paths where burning several seconds of backoff
    /// against a dead port would block the editor.
    pub async fn test_connection(&self) -> bool {
        let url = format!("{}/global/health", self.base_url);

        match self
            .http
            .get(&url)
            .timeout(TEST_CONNECTION_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Sends a request with the configured retry policy.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, RequestError> {
        let mut attempt: u32 = 0;

        loop {
            match self.send_once(method.clone(), path, body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.options.max_retries => {
                    let delay = retry::backoff_delay(
                        attempt,
                        self.options.retry_delay,
                        self.options.max_retry_delay,
                    );
                    debug!(
                        path,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying server request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One request attempt: send, classify status, decode JSON.
    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, RequestError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url).timeout(self.options.timeout);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RequestError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::from_status(status.as_u16()));
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                RequestError::Timeout
            } else {
                RequestError::InvalidResponse(e.to_string())
            }
        })
    }

    /// POST returning the server's boolean acknowledgement.
    async fn post_ack(&self, path: &str, body: Value) -> Result<bool, RequestError> {
        let value = self.request(Method::POST, path, Some(&body)).await?;

        value.as_bool().ok_or_else(|| {
            RequestError::InvalidResponse(format!("{path} response is not a boolean"))
        })
    }
}
