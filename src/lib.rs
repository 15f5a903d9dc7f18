// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Tether keeps a text editor connected to the one AI-assistant server
//! instance that serves the project the editor has open.
//!
//! The server has no fixed address: each project gets its own instance on its
//! own port, and several may run side by side. The [`connect::ConnectionManager`]
//! resolves that ambiguity: it checks a pinned instance, re-verifies the
//! current binding, discovers running instances by scanning processes, spawns
//! a fresh server when nothing matches, and falls back to the configured
//! default port as a last resort.

/// Typed HTTP client for the server's health/path/prompt endpoints.
pub mod client;
/// CLI output formatting and colors.
pub mod cli;
/// Configuration loading for ports, binary path, and terminal behavior.
pub mod config;
/// Connection lifecycle: manager cascade, spawning, sticky instance tracking.
pub mod connect;
/// Loopback port probing and available-port search.
pub mod net;
/// Diagnostic-to-prompt text formatting.
pub mod prompt;
/// Platform-specific running-server process scanning.
pub mod scan;
/// Project-directory path matching.
pub mod workspace;
