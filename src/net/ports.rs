// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Linear search for a free port to bind a freshly spawned server to.

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::probe::PortProbe;

/// Per-port probe timeout during the search. Short: these are loopback
/// connects, and the common case is an immediate refusal.
const SEARCH_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Failure of the available-port search.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortScanError {
    /// Every port in the range had a listener.
    #[error("no available ports in range {start}-{end}")]
    Exhausted {
        /// First port checked.
        start: u16,
        /// Last port checked (inclusive).
        end: u16,
    },
}

/// Returns the first port in `start..=end` with no listener.
///
/// # Errors
///
/// Returns [`PortScanError::Exhausted`] when every port in the range is busy.
pub async fn find_available_port<P: PortProbe + ?Sized>(
    probe: &P,
    start: u16,
    end: u16,
) -> Result<u16, PortScanError> {
    for port in start..=end {
        let outcome = probe.probe(port, SEARCH_PROBE_TIMEOUT).await;
        if !outcome.listening {
            debug!(port, "found available port");
            return Ok(port);
        }
    }

    Err(PortScanError::Exhausted { start, end })
}
