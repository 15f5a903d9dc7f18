// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Error classification for server requests.

use thiserror::Error;

/// HTTP 501 is the one 5xx the server uses to say "endpoint permanently
/// absent"; retrying cannot help.
const NOT_IMPLEMENTED: u16 = 501;

/// A failed request against the server, classified for retry decisions.
#[derive(Debug, Error)]
pub enum RequestError {
    /// No server reachable: connection refused/reset or host not found.
    #[error("server unavailable: {0}")]
    Unavailable(String),

    /// The server did not answer within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// The server rejected the request (4xx).
    #[error("client error: HTTP {status}")]
    Client {
        /// HTTP status code.
        status: u16,
    },

    /// The server failed internally (5xx).
    #[error("server error: HTTP {status}")]
    Server {
        /// HTTP status code.
        status: u16,
    },

    /// The server answered, but the payload failed a required-field check.
    /// Indicates a protocol mismatch, not a transient fault.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RequestError {
    /// Classifies a transport-level failure (no HTTP response received).
    pub(crate) fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Unavailable(error.to_string())
        }
    }

    /// Classifies an HTTP status outside the 2xx range.
    pub(crate) const fn from_status(status: u16) -> Self {
        if status >= 500 {
            Self::Server { status }
        } else {
            Self::Client { status }
        }
    }

    /// Whether the retry loop should try this request again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout => true,
            Self::Server { status } => *status != NOT_IMPLEMENTED,
            Self::Client { .. } | Self::InvalidResponse(_) => false,
        }
    }
}
