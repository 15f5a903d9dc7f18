// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Connection lifecycle: the manager cascade, server spawning, and the
//! sticky default-instance tracker.

/// The five-step connection cascade and bound-client ownership.
pub mod manager;
/// Server process spawning and readiness polling.
pub mod spawn;
/// Session-scoped memory of a user-pinned server instance.
pub mod sticky;

pub use manager::{ConnectionManager, ConnectionState, ManagerOptions};
pub use spawn::{ShellLauncher, SpawnError, SpawnOptions, TerminalLauncher};
pub use sticky::DefaultInstanceTracker;
