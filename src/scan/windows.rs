// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Windows process scanning via `tasklist` and `netstat`.
//!
//! `netstat -ano -p tcp` maps listening ports to PIDs; `tasklist /FO CSV`
//! names each PID. The two are joined on PID, keeping only processes whose
//! image name is the server binary.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CommandMatcher, DiscoveredProcess, ProcessScanner};

/// Scanner for Windows.
pub struct WindowsScanner {
    binary: String,
    matcher: CommandMatcher,
}

impl WindowsScanner {
    /// Creates a scanner looking for processes running `binary`.
    #[must_use]
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
            matcher: CommandMatcher::new(binary),
        }
    }

    /// Maps PID to listening TCP ports from `netstat -ano`.
    async fn listening_ports_by_pid() -> HashMap<u32, Vec<u16>> {
        let output = match Command::new("netstat").args(["-ano", "-p", "tcp"]).output().await {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                warn!(status = %output.status, "netstat exited with failure");
                return HashMap::new();
            }
            Err(e) => {
                warn!("failed to run netstat: {e}");
                return HashMap::new();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut ports: HashMap<u32, Vec<u16>> = HashMap::new();

        // Columns: proto, local address, foreign address, state, PID.
        for line in stdout.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 || !fields[3].eq_ignore_ascii_case("LISTENING") {
                continue;
            }
            let Some(port) = fields[1].rsplit(':').next().and_then(|p| p.parse::<u16>().ok())
            else {
                continue;
            };
            let Ok(pid) = fields[4].parse::<u32>() else {
                continue;
            };
            ports.entry(pid).or_default().push(port);
        }

        ports
    }

    /// Lists PIDs whose image name is the server binary.
    async fn candidate_pids(&self) -> Vec<u32> {
        let output = match Command::new("tasklist").args(["/FO", "CSV", "/NH"]).output().await {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                warn!(status = %output.status, "tasklist exited with failure");
                return Vec::new();
            }
            Err(e) => {
                warn!("failed to run tasklist: {e}");
                return Vec::new();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut pids = Vec::new();

        // CSV rows: "Image Name","PID","Session Name","Session#","Mem Usage"
        for line in stdout.lines() {
            let mut fields = line.split("\",\"");
            let Some(image) = fields.next().map(|f| f.trim_start_matches('"')) else {
                continue;
            };
            let Some(pid) = fields.next().and_then(|f| f.parse::<u32>().ok()) else {
                continue;
            };

            // Image names carry the .exe suffix the anchored match would
            // otherwise reject.
            let image = image
                .strip_suffix(".exe")
                .or_else(|| image.strip_suffix(".EXE"))
                .unwrap_or(image);

            if self.matcher.matches(image) {
                pids.push(pid);
            }
        }

        pids
    }
}

#[async_trait]
impl ProcessScanner for WindowsScanner {
    async fn scan(&self) -> Vec<DiscoveredProcess> {
        let ports_by_pid = Self::listening_ports_by_pid().await;
        let mut discovered = Vec::new();

        for pid in self.candidate_pids().await {
            if let Some(ports) = ports_by_pid.get(&pid) {
                for &port in ports {
                    discovered.push(DiscoveredProcess { pid, port });
                }
            }
        }

        debug!(count = discovered.len(), binary = %self.binary, "process scan complete");
        discovered
    }
}
