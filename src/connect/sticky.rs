// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Session-scoped memory of a user-chosen server instance.
//!
//! Deliberately dumb: the tracker remembers one port and can tell whether
//! something still listens there. Whether that something serves the right
//! project is the lifecycle manager's question, answered with a throwaway
//! client during its sticky-default step. Nothing here persists across
//! extension reloads.

use std::time::Duration;

use crate::net::probe::PortProbe;

/// Probe timeout for validity checks. Short: a pinned instance is either
/// local and fast, or gone.
const VALIDITY_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// In-memory store of the user's pinned server port.
#[derive(Debug, Default)]
pub struct DefaultInstanceTracker {
    port: Option<u16>,
}

impl DefaultInstanceTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self { port: None }
    }

    /// The pinned port, if any.
    #[must_use]
    pub const fn get(&self) -> Option<u16> {
        self.port
    }

    /// Pins a port as the preferred instance.
    pub const fn set(&mut self, port: u16) {
        self.port = Some(port);
    }

    /// Forgets the pinned instance.
    pub const fn clear(&mut self) {
        self.port = None;
    }

    /// Whether the pinned port still has a listener. Checks liveness only,
    /// not the working directory.
    pub async fn is_valid(&self, probe: &dyn PortProbe) -> bool {
        match self.port {
            Some(port) => probe.probe(port, VALIDITY_PROBE_TIMEOUT).await.listening,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::probe::ProbeOutcome;
    use async_trait::async_trait;

    struct FixedProbe {
        listening: bool,
    }

    #[async_trait]
    impl PortProbe for FixedProbe {
        async fn probe(&self, _port: u16, _timeout: Duration) -> ProbeOutcome {
            ProbeOutcome {
                listening: self.listening,
                reason: None,
            }
        }
    }

    #[test]
    fn set_get_clear() {
        let mut tracker = DefaultInstanceTracker::new();
        assert_eq!(tracker.get(), None);

        tracker.set(4242);
        assert_eq!(tracker.get(), Some(4242));

        tracker.clear();
        assert_eq!(tracker.get(), None);
    }

    #[tokio::test]
    async fn empty_tracker_is_never_valid() {
        let tracker = DefaultInstanceTracker::new();
        assert!(!tracker.is_valid(&FixedProbe { listening: true }).await);
    }

    #[tokio::test]
    async fn validity_follows_probe() {
        let mut tracker = DefaultInstanceTracker::new();
        tracker.set(4242);

        assert!(tracker.is_valid(&FixedProbe { listening: true }).await);
        assert!(!tracker.is_valid(&FixedProbe { listening: false }).await);
    }
}
