// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Finds running server processes and the TCP ports they listen on.
//!
//! The scan is best-effort: a server that is mid-startup may not have its
//! listener up yet, and enumeration tooling differs per platform. Failures
//! therefore yield an empty list, never an error; the lifecycle manager
//! retries discovery on its own schedule.

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;

#[cfg(unix)]
/// Unix scanner built on `ps` and `lsof`.
pub mod unix;
#[cfg(windows)]
/// Windows scanner built on `tasklist` and `netstat`.
pub mod windows;

/// One running server instance found by a scan. Ephemeral: consumed by the
/// discovery round that requested it, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveredProcess {
    /// Process ID of the server.
    pub pid: u32,
    /// TCP port the server listens on.
    pub port: u16,
}

/// Platform-specific enumeration of running server processes.
#[async_trait]
pub trait ProcessScanner: Send + Sync {
    /// Returns `{pid, port}` pairs for server processes currently listening.
    /// Returns an empty list on any enumeration failure.
    async fn scan(&self) -> Vec<DiscoveredProcess>;
}

/// Builds the scanner for the current platform.
#[must_use]
pub fn platform_scanner(binary: &str) -> Arc<dyn ProcessScanner> {
    #[cfg(unix)]
    {
        Arc::new(unix::UnixScanner::new(binary))
    }
    #[cfg(windows)]
    {
        Arc::new(windows::WindowsScanner::new(binary))
    }
}

/// Anchored matcher deciding whether a command line runs the server binary.
///
/// `binary` must appear at the start of the command line or right after a
/// path separator, and be followed by whitespace or end-of-string. This
/// keeps `app` from matching `app-extra`, `apphelper`, or `myapp`. The
/// regex is compiled once per scanner, not per scanned line.
pub(crate) struct CommandMatcher {
    regex: Option<Regex>,
}

impl CommandMatcher {
    pub(crate) fn new(binary: &str) -> Self {
        let pattern = format!(r"(?:^|[/\\]){}(?:\s|$)", regex::escape(binary));
        Self {
            regex: Regex::new(&pattern).ok(),
        }
    }

    /// Returns true if `command_line` runs the binary.
    pub(crate) fn matches(&self, command_line: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(command_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_bare_name() {
        assert!(CommandMatcher::new("app").matches("app"));
    }

    #[test]
    fn matches_name_with_arguments() {
        assert!(CommandMatcher::new("app").matches("app --port 4096"));
    }

    #[test]
    fn matches_absolute_path() {
        let matcher = CommandMatcher::new("app");
        assert!(matcher.matches("/usr/bin/app"));
        assert!(matcher.matches(r"C:\Program Files\app --port 4096"));
    }

    #[test]
    fn rejects_suffixed_names() {
        let matcher = CommandMatcher::new("app");
        assert!(!matcher.matches("app-extra"));
        assert!(!matcher.matches("apphelper --port 4096"));
    }

    #[test]
    fn rejects_prefixed_names() {
        let matcher = CommandMatcher::new("app");
        assert!(!matcher.matches("myapp"));
        assert!(!matcher.matches("/usr/bin/myapp"));
    }

    #[test]
    fn escapes_regex_metacharacters_in_binary_name() {
        let matcher = CommandMatcher::new("app.exe");
        assert!(matcher.matches("app.exe --port 4096"));
        assert!(!matcher.matches("appxexe --port 4096"));
    }
}
