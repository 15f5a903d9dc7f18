// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Determines whether something is listening on a loopback TCP port.
//!
//! A single connect attempt, no retries. Retry and polling policy live with
//! the callers (the lifecycle manager and the spawn readiness loop).

use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::trace;

/// Result of probing one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Whether a listener accepted (or definitively occupies) the port.
    pub listening: bool,
    /// Human-readable reason when not listening.
    pub reason: Option<String>,
}

impl ProbeOutcome {
    fn listening() -> Self {
        Self {
            listening: true,
            reason: None,
        }
    }

    fn not_listening(reason: impl Into<String>) -> Self {
        Self {
            listening: false,
            reason: Some(reason.into()),
        }
    }
}

/// A port-liveness check, injectable so tests and the port search can run
/// against a scripted network.
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Probes loopback `port`, giving up after `timeout`.
    async fn probe(&self, port: u16, timeout: Duration) -> ProbeOutcome;
}

/// The real prober: one TCP connect to `127.0.0.1:port`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

#[async_trait]
impl PortProbe for TcpProbe {
    async fn probe(&self, port: u16, timeout: Duration) -> ProbeOutcome {
        let connect = TcpStream::connect(("127.0.0.1", port));

        let outcome = match tokio::time::timeout(timeout, connect).await {
            // Connected: a listener exists. The stream drops immediately.
            Ok(Ok(_stream)) => ProbeOutcome::listening(),
            Ok(Err(e)) => classify_error(&e),
            Err(_) => ProbeOutcome::not_listening("timed out"),
        };

        trace!(port, listening = outcome.listening, "port probe");
        outcome
    }
}

/// Maps a connect error onto the probe outcome.
///
/// `AddrInUse` means the local side could not even allocate a socket because
/// the port is occupied, which still tells us something is there.
fn classify_error(error: &std::io::Error) -> ProbeOutcome {
    match error.kind() {
        ErrorKind::AddrInUse => ProbeOutcome::listening(),
        ErrorKind::ConnectionRefused => ProbeOutcome::not_listening("connection refused"),
        ErrorKind::NotFound | ErrorKind::AddrNotAvailable => {
            ProbeOutcome::not_listening("host not found")
        }
        _ => ProbeOutcome::not_listening(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_is_not_listening() {
        let error = std::io::Error::new(ErrorKind::ConnectionRefused, "refused");
        let outcome = classify_error(&error);
        assert!(!outcome.listening);
        assert_eq!(outcome.reason.as_deref(), Some("connection refused"));
    }

    #[test]
    fn addr_in_use_counts_as_listening() {
        let error = std::io::Error::new(ErrorKind::AddrInUse, "in use");
        assert!(classify_error(&error).listening);
    }

    #[test]
    fn unknown_errors_carry_raw_message() {
        let error = std::io::Error::new(ErrorKind::PermissionDenied, "permission denied");
        let outcome = classify_error(&error);
        assert!(!outcome.listening);
        assert!(outcome.reason.is_some_and(|r| r.contains("permission denied")));
    }
}
