// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! CLI utilities for terminal output formatting and colors.

use crossterm::tty::IsTty;
use std::io::stdout;

/// Configuration for color output
#[derive(Debug, Clone)]
pub struct ColorConfig {
    /// Whether ANSI colors are emitted.
    pub enabled: bool,
}

impl ColorConfig {
    /// Create a new `ColorConfig`, auto-detecting TTY unless nocolor is true
    #[must_use]
    pub fn new(nocolor: bool) -> Self {
        Self {
            enabled: !nocolor && stdout().is_tty(),
        }
    }

    /// ANSI escape code for green (connected/success)
    #[must_use]
    pub fn green(&self, s: &str) -> String {
        if self.enabled {
            format!("\x1b[32m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }

    /// ANSI escape code for red (errors/disconnected)
    #[must_use]
    pub fn red(&self, s: &str) -> String {
        if self.enabled {
            format!("\x1b[31m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }

    /// ANSI escape code for cyan (ports and endpoints)
    #[must_use]
    pub fn cyan(&self, s: &str) -> String {
        if self.enabled {
            format!("\x1b[36m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }

    /// ANSI escape code for dim text
    #[must_use]
    pub fn dim(&self, s: &str) -> String {
        if self.enabled {
            format!("\x1b[2m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }
}

/// Get the terminal width, defaulting to 80 if unable to detect
#[must_use]
pub fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(80)
}

/// Truncate a string to `max_len` characters, adding "..." if truncated
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if max_len <= 3 {
        return ".".repeat(max_len.min(3));
    }
    if s.len() <= max_len {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= max_len - 3)
            .last()
            .unwrap_or(0);
        format!("{}...", &s[..cut])
    }
}

/// Column width configuration for the scan command
/// Columns: # | PID | PORT | DIRECTORY
#[derive(Debug)]
pub struct ColumnWidths {
    /// Row number column.
    pub row_num: usize,
    /// Process ID column.
    pub pid: usize,
    /// Port column.
    pub port: usize,
    /// Served-directory column, takes all remaining space.
    pub directory: usize,
}

impl ColumnWidths {
    /// Calculate column widths based on terminal width
    #[must_use]
    pub fn calculate(term_width: usize) -> Self {
        let row_num = 3; // "#"
        let pid = 8; // "PID"
        let port = 6; // "PORT"

        // Reserve space for separators (3 spaces between columns)
        let fixed_space = row_num + pid + port + 3;
        let min_directory = 20;
        let directory = term_width.saturating_sub(fixed_space).max(min_directory);

        Self {
            row_num,
            pid,
            port,
            directory,
        }
    }
}
