// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::position::LocationSample;
use serde::{Deserialize, Serialize};

/// Placeholder address used whenever reverse geocoding gives no usable answer.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// Running statistics of the ride that is currently tracked.
///
/// The accumulator is owned by the trip tracker for the lifetime of one
/// tracking session. It is reset when a session starts and frozen into a
/// [`TripSummary`] when the session stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideStats {
    /// Sum of the great-circle distances between accepted samples.
    pub distance_meters: f64,
    pub duration_ms: i64,
    pub current_speed_kmh: f64,
    pub started_at_ms: i64,
}

impl RideStats {
    pub fn new(started_at_ms: i64) -> Self {
        RideStats {
            started_at_ms,
            ..Default::default()
        }
    }

    /// Sets the duration up to `now_ms`. A clock set back before the start
    /// yields a zero duration.
    pub fn update_duration(&mut self, now_ms: i64) {
        self.duration_ms = (now_ms - self.started_at_ms).max(0);
    }

    /// Average speed over the whole ride in km/h, `0.0` for a zero duration.
    pub fn average_speed_kmh(&self) -> f64 {
        if self.duration_ms <= 0 {
            return 0.0;
        }
        let hours = self.duration_ms as f64 / 3_600_000.0;
        (self.distance_meters / 1000.0) / hours
    }
}

/// The finalized record of a completed tracking session.
///
/// A `TripSummary` is created exactly once when a session stops, handed to the
/// trip persistence service and then dropped. It is never mutated after
/// creation.
///
/// # Fields
///
/// - `start_location` / `end_location` – First and last known fix of the ride.
/// - `start_address` / `end_address` – Reverse geocoded addresses or
///   [`UNKNOWN_LOCATION`].
/// - `route_coordinates` – Accepted raw samples, bounded in length.
/// - `snapped_route_coordinates` – Road snapped path with raw fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSummary {
    pub motor_id: String,
    pub start_location: Option<LocationSample>,
    pub end_location: Option<LocationSample>,
    pub start_address: String,
    pub end_address: String,
    pub distance_meters: f64,
    pub duration_ms: i64,
    pub average_speed_kmh: f64,
    pub started_at_ms: i64,
    pub ended_at_ms: i64,
    pub route_coordinates: Vec<LocationSample>,
    pub snapped_route_coordinates: Vec<LocationSample>,
}

impl TripSummary {
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    pub fn to_json(summary: &TripSummary) -> serde_json::Result<String> {
        serde_json::to_string(summary)
    }

    pub fn from_json(json: &str) -> serde_json::Result<TripSummary> {
        serde_json::from_str(json)
    }
}
