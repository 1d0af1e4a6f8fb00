// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{
    clock::Clock,
    error::{Error, Result},
    position::{Coordinate, LocationSample},
};
use module_core::{Event, EventKind, Module, ModuleCtx};
use std::{sync::Arc, time::Duration};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use utm::{lat_lon_to_zone_number, lat_to_zone_letter, to_utm_wgs84, wsg84_utm_to_lat_lon};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct UtmPoint {
    pub(crate) easting: f64,
    pub(crate) northing: f64,
    pub(crate) zone: u8,
    pub(crate) zone_letter: char,
}

impl UtmPoint {
    fn to_coordinate(self) -> Option<Coordinate> {
        wsg84_utm_to_lat_lon(self.easting, self.northing, self.zone, self.zone_letter)
            .ok()
            .map(|(latitude, longitude)| Coordinate::new(latitude, longitude))
    }
}

/// Converts the waypoints into one UTM zone, the zone of the first waypoint,
/// so that a path crossing a zone border stays linear.
fn convert_waypoints(waypoints: &[Coordinate]) -> Result<Vec<UtmPoint>> {
    let Some(first) = waypoints.first() else {
        return Err(Error::validation("Replay path has no waypoints"));
    };
    if let Some(invalid) = waypoints.iter().find(|waypoint| !waypoint.is_valid()) {
        return Err(Error::validation(format!(
            "Waypoint {}/{} is not a valid coordinate",
            invalid.latitude, invalid.longitude
        )));
    }
    let zone = lat_lon_to_zone_number(first.latitude, first.longitude);
    waypoints
        .iter()
        .map(|waypoint| {
            let zone_letter = lat_to_zone_letter(waypoint.latitude).ok_or_else(|| {
                Error::validation(format!(
                    "Waypoint {}/{} has no UTM zone",
                    waypoint.latitude, waypoint.longitude
                ))
            })?;
            let (northing, easting, _) = to_utm_wgs84(waypoint.latitude, waypoint.longitude, zone);
            Ok(UtmPoint {
                easting,
                northing,
                zone,
                zone_letter,
            })
        })
        .collect()
}

/// Moves along the waypoints with a fixed step per tick.
#[derive(Debug)]
pub(crate) struct ReplayRuntime {
    points: Vec<UtmPoint>,
    /// Index of the waypoint the runtime is heading to.
    target: usize,
    current: UtmPoint,
    step_m: f64,
    started: bool,
}

impl ReplayRuntime {
    pub(crate) fn new(points: Vec<UtmPoint>, step_m: f64) -> Option<Self> {
        let current = *points.first()?;
        Some(ReplayRuntime {
            points,
            target: 1,
            current,
            step_m,
            started: false,
        })
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.started && self.target >= self.points.len()
    }

    /// Returns the next position, `None` once the last waypoint was reported.
    pub(crate) fn advance(&mut self) -> Option<UtmPoint> {
        if !self.started {
            self.started = true;
            return Some(self.current);
        }
        if self.target >= self.points.len() {
            return None;
        }
        let mut remaining = self.step_m;
        while remaining > 0.0 && self.target < self.points.len() {
            let target = self.points[self.target];
            let dx = target.easting - self.current.easting;
            let dy = target.northing - self.current.northing;
            let length = dx.hypot(dy);
            if length <= remaining {
                self.current = target;
                self.target += 1;
                remaining -= length;
            } else {
                self.current.easting += dx / length * remaining;
                self.current.northing += dy / length * remaining;
                remaining = 0.0;
            }
        }
        Some(self.current)
    }
}

#[derive(Clone)]
struct ReplayConfig {
    points: Vec<UtmPoint>,
    speed_mps: f64,
    interval: Duration,
    clock: Arc<dyn Clock>,
}

/// A location source replaying a path with constant speed.
///
/// Every `interval` the source moves `speed_mps * interval` meters along the
/// waypoints and publishes the position as [`EventKind::LocationSampleEvent`].
/// After the last waypoint was published a single
/// [`EventKind::LocationSourceFinishedEvent`] follows. The module itself keeps
/// running until it receives the quit event.
pub struct ConstantLocationModule {
    ctx: ModuleCtx,
    config: ReplayConfig,
}

impl ConstantLocationModule {
    /// # Errors
    /// [`Error::Validation`] for an empty path, an invalid waypoint, a speed
    /// that is not positive or a zero interval.
    pub fn new(
        ctx: ModuleCtx,
        waypoints: &[Coordinate],
        speed_mps: f64,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if !speed_mps.is_finite() || speed_mps <= 0.0 {
            return Err(Error::validation(format!(
                "Replay speed {} m/s must be positive",
                speed_mps
            )));
        }
        if interval.is_zero() {
            return Err(Error::validation("Replay interval must not be zero"));
        }
        let points = convert_waypoints(waypoints)?;
        Ok(ConstantLocationModule {
            ctx,
            config: ReplayConfig {
                points,
                speed_mps,
                interval,
                clock,
            },
        })
    }
}

#[async_trait::async_trait]
impl Module for ConstantLocationModule {
    async fn run(&mut self) -> std::result::Result<(), ()> {
        let config = self.config.clone();
        let sender = self.ctx.sender.clone();
        let replay_task = tokio::spawn(async move { replay_task(sender, config).await });
        let mut run = true;
        while run {
            match self.ctx.receiver.recv().await {
                Ok(event) => {
                    if let EventKind::QuitEvent = event.kind {
                        run = false;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Location source skipped {} events", skipped);
                }
                Err(RecvError::Closed) => run = false,
            }
        }
        replay_task.abort();
        Ok(())
    }
}

async fn replay_task(sender: tokio::sync::broadcast::Sender<Event>, config: ReplayConfig) {
    let step_m = config.speed_mps * config.interval.as_secs_f64();
    let Some(mut runtime) = ReplayRuntime::new(config.points, step_m) else {
        return;
    };
    let mut timer = tokio::time::interval(config.interval);
    info!(
        "Replaying {} waypoints with {} m/s",
        runtime.points.len(),
        config.speed_mps
    );
    while let Some(point) = runtime.advance() {
        timer.tick().await;
        let Some(coordinate) = point.to_coordinate() else {
            warn!("Position {:?} can't be converted back from UTM", point);
            continue;
        };
        let sample = LocationSample::from_coordinate(&coordinate, config.clock.now_ms())
            .with_speed(config.speed_mps);
        let _ = sender.send(Event {
            kind: EventKind::LocationSampleEvent(Arc::new(sample)),
        });
        if runtime.is_finished() {
            break;
        }
    }
    info!("Replay finished");
    let _ = sender.send(Event {
        kind: EventKind::LocationSourceFinishedEvent,
    });
}
