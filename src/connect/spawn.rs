// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Spawns a fresh server instance and waits for it to become ready.
//!
//! Readiness is polled against the working-directory endpoint. Once that
//! answers, one extra settling delay is applied before the instance is
//! declared usable: the HTTP layer of a freshly spawned server comes up
//! before its interactive front-end, and a prompt sent in that window is
//! silently dropped.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::client::{ClientOptions, ServerClient};
use crate::net::ports::PortScanError;

/// Timing knobs for the spawn path.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    /// Readiness polls before giving up.
    pub readiness_attempts: u32,
    /// Delay between readiness polls.
    pub readiness_interval: Duration,
    /// Extra wait after the server first answers.
    pub settle_delay: Duration,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            readiness_attempts: 30,
            readiness_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// Why the spawn path failed. Stored on the manager and surfaced to the user
/// on demand; never propagated as an exception out of the cascade.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The free-port search exhausted its range.
    #[error(transparent)]
    NoAvailablePort(#[from] PortScanError),

    /// The server process could not be launched.
    #[error("failed to launch server: {0}")]
    Launch(String),

    /// The process launched but never answered within the readiness window.
    #[error("server did not become ready within {seconds}s")]
    NotReady {
        /// Total time waited.
        seconds: u64,
    },
}

/// Launches a server command in a user-visible shell.
///
/// The default [`ShellLauncher`] runs the platform shell directly; editor
/// glue substitutes its own implementation to open an integrated terminal
/// (and honor focus) instead.
#[async_trait]
pub trait TerminalLauncher: Send + Sync {
    /// Starts `command` without waiting for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started.
    async fn launch(&self, command: &str, focus: bool) -> Result<()>;
}

/// Launcher that runs the command through `sh -c` (or `cmd /c` on Windows).
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellLauncher;

#[async_trait]
impl TerminalLauncher for ShellLauncher {
    async fn launch(&self, command: &str, _focus: bool) -> Result<()> {
        info!(command, "launching server");

        let mut shell = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.args(["/c", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };

        // The server owns its own lifetime; we only start it.
        shell
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to spawn: {command}"))?;

        Ok(())
    }
}

/// Spawns `binary --port <port>` and waits until the instance is ready.
///
/// # Errors
///
/// Returns a [`SpawnError`] describing the first failure: launch, or
/// readiness timeout.
pub async fn spawn_server(
    launcher: &dyn TerminalLauncher,
    binary: &str,
    port: u16,
    focus: bool,
    options: &SpawnOptions,
) -> Result<(), SpawnError> {
    let command = format!("{binary} --port {port}");

    launcher
        .launch(&command, focus)
        .await
        .map_err(|e| SpawnError::Launch(e.to_string()))?;

    let client = ServerClient::new(ClientOptions::quick_probe(port))
        .map_err(|e| SpawnError::Launch(e.to_string()))?;

    for attempt in 0..options.readiness_attempts {
        if client.working_directory().await.is_ok() {
            debug!(port, attempt, "spawned server answered, settling");
            tokio::time::sleep(options.settle_delay).await;
            return Ok(());
        }
        tokio::time::sleep(options.readiness_interval).await;
    }

    let seconds =
        (options.readiness_interval * options.readiness_attempts).as_secs();
    warn!(port, seconds, "spawned server never became ready");
    Err(SpawnError::NotReady { seconds })
}
