// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::vehicle::{Motor, MotorPatch};

#[test]
fn parse_backend_motor() {
    let json = r#"{
        "_id": "64f0",
        "nickname": "Weekend",
        "currentFuelLevel": 42.5,
        "totalDrivableDistanceKm": 300,
        "analytics": { "totalDistance": 1234.5 },
        "unknownField": true
    }"#;
    let motor = Motor::from_json(json).unwrap();
    assert_eq!(motor.id, "64f0");
    assert_eq!(motor.current_fuel_level, 42.5);
    assert_eq!(motor.total_drivable_distance_km, Some(300.0));
    assert_eq!(motor.analytics.total_distance, 1234.5);
    assert_eq!(motor.analytics.trips_completed, 0);
}

#[test]
fn missing_range_is_not_drivable() {
    let motor = Motor::from_json(r#"{"id": "m"}"#).unwrap();
    assert_eq!(motor.total_drivable_distance_km, None);
    assert!(!motor.has_drivable_range());
    assert!(!Motor::new("m", "", 50.0, Some(0.0)).has_drivable_range());
    assert!(!Motor::new("m", "", 50.0, Some(f64::NAN)).has_drivable_range());
    assert!(Motor::new("m", "", 50.0, Some(0.5)).has_drivable_range());
}

#[test]
fn patch_only_touches_set_fields() {
    let motor = Motor::new("m", "Daily", 80.0, Some(100.0));
    let patched = motor.patched(&MotorPatch::fuel_level(70.0));
    assert_eq!(patched.current_fuel_level, 70.0);
    assert_eq!(patched.nickname, "Daily");
    assert_eq!(patched.total_drivable_distance_km, Some(100.0));
}

#[test]
fn merged_patch_prefers_newer_values() {
    let older = MotorPatch {
        current_fuel_level: Some(60.0),
        nickname: Some("Old".to_string()),
    };
    let merged = older.merge(&MotorPatch::fuel_level(55.0));
    assert_eq!(merged.current_fuel_level, Some(55.0));
    assert_eq!(merged.nickname, Some("Old".to_string()));
}
