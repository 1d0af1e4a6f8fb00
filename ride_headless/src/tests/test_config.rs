// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::config::{RunnerConfig, read_waypoints};
use common::position::Coordinate;

#[test]
fn partial_config_keeps_defaults() {
    let config = RunnerConfig::from_json(
        r#"{ "api": { "base_url": "https://ride.example.com/api" }, "tracker": { "snap_batch_size": 20 } }"#,
    )
    .unwrap();

    assert_eq!(config.api.base_url, "https://ride.example.com/api");
    assert_eq!(config.api.request_timeout_ms, 10_000);
    assert_eq!(config.tracker.snap_batch_size, 20);
    assert_eq!(config.tracker.snap_batch_window_ms, 15_000);
    assert_eq!(config.store.stale_after_ms, 30_000);
}

#[test]
fn missing_config_file_uses_defaults() {
    assert_eq!(RunnerConfig::load(None).unwrap(), RunnerConfig::default());
}

#[test]
fn invalid_config_is_an_error() {
    assert!(RunnerConfig::from_json(r#"{ "tracker": { "snap_batch_size": "many" } }"#).is_err());
}

#[test]
fn waypoints_are_read_as_longitude_latitude() {
    let csv = "longitude,latitude\n11.282535,52.026649\n 11.282047 , 52.026751\n";

    let waypoints = read_waypoints(csv.as_bytes()).unwrap();

    assert_eq!(
        waypoints,
        vec![
            Coordinate::new(52.026649, 11.282535),
            Coordinate::new(52.026751, 11.282047),
        ]
    );
}

#[test]
fn malformed_waypoint_row_is_an_error() {
    let csv = "longitude,latitude\n11.282535,north\n";

    assert!(read_waypoints(csv.as_bytes()).is_err());
}
