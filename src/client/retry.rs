// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Exponential backoff with jitter for server requests.
//!
//! Base delay doubles per attempt up to a cap, then the result is jittered
//! ±20% so several editor windows retrying against the same dead port do not
//! hammer it in lockstep.

use std::time::Duration;

/// Jitter spread: the delay is scaled by a factor in `[0.8, 1.2]`.
const JITTER_FACTOR: f64 = 0.2;

/// Returns the delay before retry number `attempt` (zero-based).
#[must_use]
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let raw = base.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = raw.min(cap.as_secs_f64());

    let jitter = 1.0 + (rand::random::<f64>() * 2.0 - 1.0) * JITTER_FACTOR;
    Duration::from_secs_f64(capped * jitter)
}
