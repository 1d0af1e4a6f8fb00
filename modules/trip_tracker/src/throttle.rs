// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

/// Timer gated notifier.
///
/// Lets at most one value pass per interval. A value offered too early is
/// kept as pending, replacing an older pending one, and released by the next
/// [`Throttle::poll`] after the interval elapsed. Observers therefore always
/// end up with the latest value.
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    interval_ms: i64,
    last_emitted_at_ms: Option<i64>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval_ms: i64) -> Self {
        Throttle {
            interval_ms,
            last_emitted_at_ms: None,
            pending: None,
        }
    }

    fn is_open(&self, now_ms: i64) -> bool {
        self.last_emitted_at_ms
            .is_none_or(|last| now_ms - last >= self.interval_ms)
    }

    /// Returns `value` if it may be emitted now, otherwise keeps it pending.
    pub fn offer(&mut self, value: T, now_ms: i64) -> Option<T> {
        if self.is_open(now_ms) {
            self.last_emitted_at_ms = Some(now_ms);
            self.pending = None;
            return Some(value);
        }
        self.pending = Some(value);
        None
    }

    /// Releases the pending value once the interval elapsed.
    pub fn poll(&mut self, now_ms: i64) -> Option<T> {
        if self.pending.is_none() || !self.is_open(now_ms) {
            return None;
        }
        self.last_emitted_at_ms = Some(now_ms);
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn reset(&mut self) {
        self.last_emitted_at_ms = None;
        self.pending = None;
    }
}
