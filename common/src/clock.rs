// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::Utc;

/// A source of wall clock time in Unix milliseconds.
///
/// The trip tracker uses it to stamp the start of a ride, to measure the ride
/// duration and to gate the throttled statistics notification. Tests replace it
/// with [`crate::test_helper::manual_clock::ManualClock`] to control time
/// deterministically.
pub trait Clock: Send + Sync {
    /// Returns the current time as Unix timestamp in milliseconds.
    fn now_ms(&self) -> i64;
}

/// A [`Clock`] backed by the system UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        SystemClock
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
