// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::position::{Coordinate, LocationSample};

#[test]
fn parse_sample_without_speed() {
    let sample =
        LocationSample::from_json(r#"{"latitude":52.0,"longitude":11.0,"timestampMs":1000}"#)
            .unwrap();
    assert_eq!(sample, LocationSample::new(52.0, 11.0, 1000));
    assert_eq!(sample.speed_mps, None);
}

#[test]
fn coordinate_range_validation() {
    assert!(Coordinate::new(52.0, 11.0).is_valid());
    assert!(Coordinate::new(-90.0, 180.0).is_valid());
    assert!(!Coordinate::new(90.1, 11.0).is_valid());
    assert!(!Coordinate::new(52.0, -180.5).is_valid());
    assert!(!Coordinate::new(f64::NAN, 11.0).is_valid());
    assert!(!Coordinate::new(52.0, f64::INFINITY).is_valid());
}

#[test]
fn coordinate_from_json() {
    let coordinate = Coordinate::from_json(r#"{"latitude":1.5,"longitude":-2.5}"#).unwrap();
    assert_eq!(coordinate, Coordinate::new(1.5, -2.5));
}
