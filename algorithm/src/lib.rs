// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Numeric building blocks of the trip tracker.
//!
//! Everything in here is a pure function over the common data types so the
//! tracker state machine stays free of arithmetic details.

use common::error::{Error, Result};
use common::position::{Coordinate, LocationSample};

/// Mean earth radius in meters used for the great-circle distance.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub const MIN_FUEL_LEVEL: f64 = 0.0;
pub const MAX_FUEL_LEVEL: f64 = 100.0;

/// Calculates the great-circle distance in meters between two geographic positions.
///
/// Uses the haversine formula with double precision on a spherical earth of
/// radius [`EARTH_RADIUS_M`].
///
/// # Parameters
/// - `pos1`: Reference to the first geographic position.
/// - `pos2`: Reference to the second geographic position.
///
/// # Returns
/// The distance between `pos1` and `pos2` in meters. Identical positions yield `0.0`.
pub fn calculate_distance(pos1: &Coordinate, pos2: &Coordinate) -> f64 {
    let d_lat = (pos2.latitude - pos1.latitude).to_radians();
    let d_lon = (pos2.longitude - pos1.longitude).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + pos1.latitude.to_radians().cos()
            * pos2.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` marginally above 1 for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Suppresses GPS jitter by requiring a minimum movement and a minimum time
/// between two accepted samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterFilter {
    pub min_distance_m: f64,
    pub min_interval_ms: i64,
}

impl JitterFilter {
    pub fn new(min_distance_m: f64, min_interval_ms: i64) -> Self {
        JitterFilter {
            min_distance_m,
            min_interval_ms,
        }
    }

    /// Decides whether `next` is accepted after the previously accepted sample.
    ///
    /// Returns the distance in meters to add to the ride if the sample is
    /// accepted, `None` if it is jitter. The first sample of a ride (`prev` is
    /// `None`) is always accepted and contributes no distance.
    pub fn accept(&self, prev: Option<&LocationSample>, next: &LocationSample) -> Option<f64> {
        let Some(prev) = prev else {
            return Some(0.0);
        };
        let distance = calculate_distance(&prev.coordinate(), &next.coordinate());
        let interval = next.timestamp_ms - prev.timestamp_ms;
        if distance < self.min_distance_m || interval < self.min_interval_ms {
            return None;
        }
        Some(distance)
    }
}

/// Derives the current speed in km/h for an accepted sample.
///
/// The receiver reported speed wins if it is present, finite and not negative.
/// Otherwise the speed is derived from the distance and time to the previous
/// accepted sample. Without a usable time delta the speed is `0.0`.
pub fn derive_speed_kmh(prev: Option<&LocationSample>, next: &LocationSample, distance_m: f64) -> f64 {
    if let Some(speed) = next.speed_mps
        && speed.is_finite()
        && speed >= 0.0
    {
        return speed * 3.6;
    }
    let Some(prev) = prev else {
        return 0.0;
    };
    let interval_ms = next.timestamp_ms - prev.timestamp_ms;
    if interval_ms <= 0 || !distance_m.is_finite() {
        return 0.0;
    }
    distance_m / (interval_ms as f64 / 1000.0) * 3.6
}

/// Result of a fuel level derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FuelDerivation {
    /// The new fuel level in percent, inside `0..=100`.
    Level(f64),
    /// No usable drivable range is known, no update must be sent.
    Skipped,
}

/// Derives the fuel level after driving `incremental_km` kilometers.
///
/// The consumption is linear in the distance over the rated drivable range:
/// `delta = incremental_km / range_km * 100`. The result is clamped to
/// `0..=100`. A missing, non finite or non positive range yields
/// [`FuelDerivation::Skipped`].
///
/// # Errors
/// Returns [`Error::Validation`] for a non finite current level or a non
/// finite or negative distance.
pub fn derive_fuel_level(
    current_level: f64,
    incremental_km: f64,
    range_km: Option<f64>,
) -> Result<FuelDerivation> {
    let range_km = match range_km {
        Some(range) if range.is_finite() && range > 0.0 => range,
        _ => return Ok(FuelDerivation::Skipped),
    };
    if !current_level.is_finite() {
        return Err(Error::validation(format!(
            "current fuel level {current_level} is not finite"
        )));
    }
    if !incremental_km.is_finite() || incremental_km < 0.0 {
        return Err(Error::validation(format!(
            "driven distance {incremental_km} km is invalid"
        )));
    }
    let delta = incremental_km / range_km * 100.0;
    let level = (current_level - delta).max(MIN_FUEL_LEVEL);
    validate_fuel_level(level.min(MAX_FUEL_LEVEL)).map(FuelDerivation::Level)
}

/// Checks that `level` may be sent to the fuel level service.
///
/// # Errors
/// Returns [`Error::Validation`] for NaN, infinite and out of range values.
pub fn validate_fuel_level(level: f64) -> Result<f64> {
    if !level.is_finite() {
        return Err(Error::validation(format!("fuel level {level} is not finite")));
    }
    if !(MIN_FUEL_LEVEL..=MAX_FUEL_LEVEL).contains(&level) {
        return Err(Error::validation(format!(
            "fuel level {level} is outside of {MIN_FUEL_LEVEL}..={MAX_FUEL_LEVEL}"
        )));
    }
    Ok(level)
}

#[cfg(test)]
mod tests;
