// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    collections::{GasStation, Report, UserProfile},
    position::{Coordinate, LocationSample},
    trip::TripSummary,
    vehicle::Motor,
};

/// Meters per degree of latitude for the mean earth radius of 6 371 000 m.
pub const METERS_PER_DEGREE_LATITUDE: f64 = 6_371_000.0 * std::f64::consts::PI / 180.0;

pub const START_LATITUDE: f64 = 52.026649;
pub const START_LONGITUDE: f64 = 11.282535;

pub fn get_motor(fuel_level: f64, total_drivable_distance_km: Option<f64>) -> Motor {
    Motor::new("motor-1", "Daily Rider", fuel_level, total_drivable_distance_km)
}

/// Returns a sample `meters_north` meters north of the fixed test start point.
///
/// Moving along a meridian keeps the haversine distance between two samples
/// equal to the difference of their `meters_north` values.
pub fn sample_north_of_start(meters_north: f64, timestamp_ms: i64) -> LocationSample {
    LocationSample::new(
        START_LATITUDE + meters_north / METERS_PER_DEGREE_LATITUDE,
        START_LONGITUDE,
        timestamp_ms,
    )
}

pub fn get_reports() -> Vec<Report> {
    vec![
        Report {
            id: "report-1".to_string(),
            report_type: "Traffic".to_string(),
            description: "Slow traffic on the bridge".to_string(),
            location: Some(Coordinate::new(START_LATITUDE, START_LONGITUDE)),
            timestamp_ms: Some(1_700_000_000_000),
        },
        Report {
            id: "report-2".to_string(),
            report_type: "Hazard".to_string(),
            description: "Gravel in the curve".to_string(),
            location: None,
            timestamp_ms: None,
        },
    ]
}

pub fn get_stations() -> Vec<GasStation> {
    vec![GasStation {
        id: "station-1".to_string(),
        name: "Center".to_string(),
        brand: Some("Petro".to_string()),
        location: Some(Coordinate::new(52.03, 11.29)),
    }]
}

pub fn get_profile(user_id: &str) -> UserProfile {
    UserProfile {
        id: user_id.to_string(),
        name: "Rider".to_string(),
        email: "rider@example.com".to_string(),
    }
}

/// A finished one kilometer ride to the north, lasting two minutes.
pub fn get_trip_summary() -> TripSummary {
    let start = sample_north_of_start(0.0, 1_700_000_000_000);
    let end = sample_north_of_start(1000.0, 1_700_000_120_000);
    TripSummary {
        motor_id: "motor-1".to_string(),
        start_location: Some(start),
        end_location: Some(end),
        start_address: "Market Square 1".to_string(),
        end_address: "Station Road 7".to_string(),
        distance_meters: 1000.0,
        duration_ms: 120_000,
        average_speed_kmh: 30.0,
        started_at_ms: start.timestamp_ms,
        ended_at_ms: end.timestamp_ms,
        route_coordinates: vec![start, end],
        snapped_route_coordinates: vec![start, end],
    }
}
