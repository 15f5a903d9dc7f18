// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Formats editor diagnostics into prompt text for the server.

/// One editor diagnostic, ready to be turned into prompt text.
#[derive(Debug, Clone)]
pub struct DiagnosticContext {
    /// Path of the file, relative to the workspace root.
    pub path: String,
    /// Zero-based line the diagnostic is attached to.
    pub line: u32,
    /// Diagnostic code (e.g. "TS2322"), if the tool provides one.
    pub code: Option<String>,
    /// Human-readable diagnostic message.
    pub message: String,
}

/// Formats a diagnostic as a "fix this" prompt.
///
/// The line number is rendered one-based, matching what the user sees in the
/// editor gutter.
#[must_use]
pub fn format_fix_prompt(diagnostic: &DiagnosticContext) -> String {
    let code = diagnostic
        .code
        .as_deref()
        .map(|c| format!(" [{c}]"))
        .unwrap_or_default();

    format!(
        "Explain what this problem is and help me fix it: {}{} @{}#L{}",
        diagnostic.message,
        code,
        diagnostic.path,
        diagnostic.line + 1
    )
}
