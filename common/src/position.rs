// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude and longitude.
///
/// The `Coordinate` struct is the unit exchanged with the road snapping and
/// reverse geocoding services. Latitude values range from -90.0 to 90.0, and
/// longitude values range from -180.0 to 180.0.
///
/// # Example
///
/// ```rust
/// use common::position::Coordinate;
///
/// let coordinate = Coordinate {
///     latitude: 52.5200,
///     longitude: 13.4050,
/// };
/// assert!(coordinate.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if both components are finite and inside the WGS84 value range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A single location fix as delivered by the platform location service.
///
/// Samples are ephemeral. The trip tracker consumes them immediately and only
/// keeps the ones it accepted in its bounded route buffers.
///
/// # Fields
///
/// - `latitude` / `longitude` – Position in decimal degrees.
/// - `timestamp_ms` – Unix timestamp of the fix in milliseconds.
/// - `speed_mps` – Speed reported by the receiver in meters per second, if any.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        LocationSample {
            latitude,
            longitude,
            timestamp_ms,
            speed_mps: None,
        }
    }

    /// Returns a copy of the sample carrying the given receiver speed.
    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Builds a sample for a coordinate that was derived from another sample,
    /// e.g. a road snapped point. The receiver speed is not carried over.
    pub fn from_coordinate(coordinate: &Coordinate, timestamp_ms: i64) -> Self {
        LocationSample::new(coordinate.latitude, coordinate.longitude, timestamp_ms)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
