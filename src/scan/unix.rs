// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Unix process scanning via `ps` and `lsof`.
//!
//! `ps -eo pid=,args=` yields candidate PIDs whose command line runs the
//! server binary; `lsof` then reports which TCP ports each candidate has in
//! LISTEN state. One `lsof` invocation per candidate keeps the output
//! unambiguous (no PID column parsing).

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CommandMatcher, DiscoveredProcess, ProcessScanner};

/// Scanner for Unix-like platforms.
pub struct UnixScanner {
    binary: String,
    matcher: CommandMatcher,
}

impl UnixScanner {
    /// Creates a scanner looking for processes running `binary`.
    #[must_use]
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
            matcher: CommandMatcher::new(binary),
        }
    }

    /// Lists PIDs whose command line runs the server binary.
    async fn candidate_pids(&self) -> Vec<u32> {
        let output = match Command::new("ps").args(["-eo", "pid=,args="]).output().await {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                warn!(status = %output.status, "ps exited with failure");
                return Vec::new();
            }
            Err(e) => {
                warn!("failed to run ps: {e}");
                return Vec::new();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut pids = Vec::new();

        for line in stdout.lines() {
            let trimmed = line.trim_start();
            let Some((pid_str, command)) = trimmed.split_once(char::is_whitespace) else {
                continue;
            };
            let Ok(pid) = pid_str.parse::<u32>() else {
                continue;
            };
            if self.matcher.matches(command.trim_start()) {
                pids.push(pid);
            }
        }

        pids
    }

    /// Returns the TCP ports `pid` listens on.
    async fn listening_ports(pid: u32) -> Vec<u16> {
        let output = Command::new("lsof")
            .args([
                "-a",
                "-p",
                &pid.to_string(),
                "-iTCP",
                "-sTCP:LISTEN",
                "-P",
                "-n",
                "-Fn",
            ])
            .output()
            .await;

        let output = match output {
            // lsof exits non-zero when the process has no matching sockets;
            // treat that the same as empty output.
            Ok(output) => output,
            Err(e) => {
                warn!(pid, "failed to run lsof: {e}");
                return Vec::new();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut ports = Vec::new();

        // -Fn field output: lines like "n127.0.0.1:4096" or "n*:4096".
        for line in stdout.lines() {
            let Some(name) = line.strip_prefix('n') else {
                continue;
            };
            if let Some(port) = name.rsplit(':').next().and_then(|p| p.parse::<u16>().ok()) {
                ports.push(port);
            }
        }

        ports
    }
}

#[async_trait]
impl ProcessScanner for UnixScanner {
    async fn scan(&self) -> Vec<DiscoveredProcess> {
        let mut discovered = Vec::new();

        for pid in self.candidate_pids().await {
            for port in Self::listening_ports(pid).await {
                discovered.push(DiscoveredProcess { pid, port });
            }
        }

        debug!(count = discovered.len(), binary = %self.binary, "process scan complete");
        discovered
    }
}
