// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use api::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Tuning of the trip tracker. Every field has a default, so a partial JSON
/// object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// A snapping batch closes after this many accepted samples.
    pub snap_batch_size: usize,
    /// A snapping batch closes this many milliseconds after its first sample.
    pub snap_batch_window_ms: i64,
    /// Minimum distance to the previous accepted sample.
    pub min_sample_distance_m: f64,
    /// Minimum time to the previous accepted sample.
    pub min_sample_interval_ms: i64,
    /// Capacity of the raw and the snapped route, the oldest points are evicted.
    pub max_route_points: usize,
    /// Minimum time between two published ride statistics.
    pub stats_interval_ms: i64,
    /// Period of the module tick closing timed out batches and flushing statistics.
    pub tick_interval_ms: u64,
    /// Applied to trip persistence and fuel level updates.
    pub retry: RetryPolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            snap_batch_size: 10,
            snap_batch_window_ms: 15_000,
            min_sample_distance_m: 5.0,
            min_sample_interval_ms: 1000,
            max_route_points: 2000,
            stats_interval_ms: 2000,
            tick_interval_ms: 250,
            retry: RetryPolicy::default(),
        }
    }
}
