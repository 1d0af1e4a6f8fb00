// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::constant_source::{ReplayRuntime, UtmPoint};

fn point(easting: f64, northing: f64) -> UtmPoint {
    UtmPoint {
        easting,
        northing,
        zone: 32,
        zone_letter: 'U',
    }
}

#[test]
fn first_waypoint_is_reported_first() {
    let mut runtime = ReplayRuntime::new(vec![point(0.0, 0.0), point(0.0, 10.0)], 4.0).unwrap();

    assert_eq!(runtime.advance(), Some(point(0.0, 0.0)));
    assert!(!runtime.is_finished());
}

#[test]
fn step_carries_over_waypoints() {
    let mut runtime = ReplayRuntime::new(
        vec![point(0.0, 0.0), point(0.0, 3.0), point(4.0, 3.0)],
        4.0,
    )
    .unwrap();
    runtime.advance();

    assert_eq!(runtime.advance(), Some(point(1.0, 3.0)));
    assert_eq!(runtime.advance(), Some(point(4.0, 3.0)));
    assert!(runtime.is_finished());
    assert_eq!(runtime.advance(), None);
}

#[test]
fn single_waypoint_finishes_immediately() {
    let mut runtime = ReplayRuntime::new(vec![point(5.0, 5.0)], 1.0).unwrap();

    assert_eq!(runtime.advance(), Some(point(5.0, 5.0)));
    assert!(runtime.is_finished());
}
