// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::error::Result;
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use tracing::{debug, warn};

/// Exponential backoff for calls whose failure would end a session.
///
/// An operation is attempted at most `max_attempts` times. After the n-th
/// failed attempt the policy waits `base_delay_ms * factor^(n-1)` before the
/// next one. Only errors classified as retryable
/// ([`common::error::Error::is_retryable`]) are retried, every other error is
/// returned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1000,
            factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay to wait after the failed attempt number `attempt` (1 based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = u64::from(self.factor).saturating_pow(exponent);
        Duration::from_millis(self.base_delay_ms.saturating_mul(multiplier))
    }

    /// Runs `operation` until it succeeds, fails with a non retryable error or
    /// the attempts are exhausted. The last error is returned in the latter cases.
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded in attempt {}", name, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{} failed in attempt {}/{}, retrying in {:?}. Error: {}",
                        name, attempt, max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("{} failed in attempt {}. Error: {}", name, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
