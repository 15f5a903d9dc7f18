// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Loopback TCP probing and available-port search.

/// Available-port search over a port range.
pub mod ports;
/// Single-port liveness probing.
pub mod probe;

pub use ports::{PortScanError, find_available_port};
pub use probe::{PortProbe, ProbeOutcome, TcpProbe};
