// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{TrackerConfig, throttle::Throttle};
use algorithm::{FuelDerivation, JitterFilter, derive_fuel_level, derive_speed_kmh};
use api::{FuelUpdater, ReverseGeocoder, RoadSnapper, TripRepository};
use common::{
    clock::Clock,
    collections::CollectionSelector,
    error::{Error, Result},
    position::{Coordinate, LocationSample},
    trip::{RideStats, TripSummary, UNKNOWN_LOCATION},
    vehicle::{Motor, MotorPatch},
};
use domain_store::DomainStore;
use module_core::{
    Event, EventKind, FuelLevel, FuelUpdateFailed, GeocodingDegraded, SnappingDegraded,
    SnappingDegradedReason, TrackingStarted, TripSaveFailed, TripSaved,
};
use std::{collections::VecDeque, sync::Arc, time::Duration};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

/// Remote collaborators of the tracker.
#[derive(Clone)]
pub struct TrackerServices {
    pub snapper: Arc<dyn RoadSnapper>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub fuel_updater: Arc<dyn FuelUpdater>,
    pub trips: Arc<dyn TripRepository>,
}

/// Result of a snapping call, delivered back to the tracker that issued it.
#[derive(Debug)]
pub struct SnapOutcome {
    session_id: u64,
    batch: Vec<LocationSample>,
    result: Result<Vec<Coordinate>>,
}

#[derive(Debug)]
struct FuelJob {
    motor_id: String,
    level: f64,
}

struct FuelWorker {
    queue: mpsc::UnboundedSender<FuelJob>,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct ActiveRide {
    session_id: u64,
    motor: Motor,
    stats: RideStats,
    start_location: Option<LocationSample>,
    start_address: String,
    last_accepted: Option<LocationSample>,
    raw_route: VecDeque<LocationSample>,
    snapped_route: VecDeque<LocationSample>,
    /// Open batch and the clock time its first sample was accepted.
    batch: Vec<LocationSample>,
    batch_opened_at_ms: i64,
    queued_batches: VecDeque<Vec<LocationSample>>,
    in_flight_batch: Option<Vec<LocationSample>>,
    /// Distance not yet used for a fuel derivation.
    underived_distance_m: f64,
}

#[derive(Debug)]
enum TrackerState {
    Idle,
    Tracking(Box<ActiveRide>),
}

fn push_capped(route: &mut VecDeque<LocationSample>, sample: LocationSample, capacity: usize) {
    route.push_back(sample);
    while route.len() > capacity.max(1) {
        route.pop_front();
    }
}

/// Assigns every snapped point the timestamp of the proportionally
/// corresponding raw sample of its batch.
fn stamp_snapped_points(snapped: &[Coordinate], batch: &[LocationSample]) -> Vec<LocationSample> {
    let last_raw = batch.len().saturating_sub(1);
    let last_snapped = snapped.len().saturating_sub(1);
    snapped
        .iter()
        .enumerate()
        .map(|(index, coordinate)| {
            let raw_index = if last_snapped == 0 {
                0
            } else {
                ((index * last_raw) as f64 / last_snapped as f64).round() as usize
            };
            let timestamp_ms = batch
                .get(raw_index.min(last_raw))
                .map_or(0, |sample| sample.timestamp_ms);
            LocationSample::from_coordinate(coordinate, timestamp_ms)
        })
        .collect()
}

/// The trip tracker state machine.
///
/// `Idle → start() → Tracking → stop() → Idle`. While tracking, accepted
/// location samples feed the ride statistics, the raw route and the snapping
/// batches. Closed batches are snapped one after another in the background,
/// their results come back through [`TripTracker::next_snap_outcome`] and
/// must be handed to [`TripTracker::apply_snap_outcome`].
///
/// Background tasks are aborted when the tracker is dropped.
pub struct TripTracker {
    services: TrackerServices,
    store: Option<Arc<DomainStore>>,
    config: TrackerConfig,
    clock: Arc<dyn Clock>,
    sender: broadcast::Sender<Event>,
    jitter: JitterFilter,
    stats_throttle: Throttle<RideStats>,
    state: TrackerState,
    next_session_id: u64,
    snap_tx: mpsc::UnboundedSender<SnapOutcome>,
    snap_rx: mpsc::UnboundedReceiver<SnapOutcome>,
    snap_task: Option<JoinHandle<()>>,
    fuel_worker: Option<FuelWorker>,
}

impl TripTracker {
    pub fn new(
        services: TrackerServices,
        store: Option<Arc<DomainStore>>,
        config: TrackerConfig,
        clock: Arc<dyn Clock>,
        sender: broadcast::Sender<Event>,
    ) -> Self {
        let (snap_tx, snap_rx) = mpsc::unbounded_channel();
        TripTracker {
            jitter: JitterFilter::new(config.min_sample_distance_m, config.min_sample_interval_ms),
            stats_throttle: Throttle::new(config.stats_interval_ms),
            services,
            store,
            config,
            clock,
            sender,
            state: TrackerState::Idle,
            next_session_id: 1,
            snap_tx,
            snap_rx,
            snap_task: None,
            fuel_worker: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn publish(&self, kind: EventKind) {
        let _ = self.sender.send(Event { kind });
    }

    fn ride(&self) -> Option<&ActiveRide> {
        match &self.state {
            TrackerState::Tracking(ride) => Some(ride),
            TrackerState::Idle => None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.ride().is_some()
    }

    pub fn stats(&self) -> Option<RideStats> {
        self.ride().map(|ride| ride.stats)
    }

    pub fn raw_route(&self) -> Vec<LocationSample> {
        self.ride()
            .map(|ride| ride.raw_route.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn snapped_route(&self) -> Vec<LocationSample> {
        self.ride()
            .map(|ride| ride.snapped_route.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The tracker's copy of the ridden motor, including derived fuel levels.
    pub fn motor(&self) -> Option<Motor> {
        self.ride().map(|ride| ride.motor.clone())
    }

    /// Returns `true` while a snapping call is running.
    pub fn is_snapping(&self) -> bool {
        self.ride().is_some_and(|ride| ride.in_flight_batch.is_some())
    }

    /// Starts tracking a ride with `motor`.
    ///
    /// The start location is reverse geocoded and becomes the first route
    /// point, so the way to the first sample counts as distance. Without a
    /// start location the first accepted sample becomes the start and the
    /// address stays [`UNKNOWN_LOCATION`].
    ///
    /// # Errors
    /// - [`Error::InvalidState`] if a ride is already tracked.
    /// - [`Error::Validation`] for an empty motor id or an invalid start location.
    pub async fn start(&mut self, motor: Motor, start_location: Option<LocationSample>) -> Result<()> {
        if self.is_tracking() {
            return Err(Error::invalid_state("A ride is already tracked"));
        }
        if motor.id.trim().is_empty() {
            return Err(Error::validation("Motor id must not be empty"));
        }
        if let Some(location) = &start_location {
            if !location.coordinate().is_valid() {
                return Err(Error::validation("Start location is not a valid coordinate"));
            }
        }

        let start_address = match &start_location {
            Some(location) => self.geocode_or_placeholder(&location.coordinate()).await,
            None => {
                self.publish(EventKind::GeocodingDegradedEvent(Arc::new(GeocodingDegraded {
                    placeholder: UNKNOWN_LOCATION.to_string(),
                    error: None,
                })));
                UNKNOWN_LOCATION.to_string()
            }
        };

        let started_at_ms = self.clock.now_ms();
        let session_id = self.next_session_id;
        self.next_session_id += 1;
        self.stats_throttle.reset();

        let mut batch = Vec::with_capacity(self.config.snap_batch_size);
        batch.extend(start_location);
        let ride = ActiveRide {
            session_id,
            motor,
            stats: RideStats::new(started_at_ms),
            start_location,
            start_address: start_address.clone(),
            last_accepted: start_location,
            raw_route: start_location.into_iter().collect(),
            snapped_route: VecDeque::new(),
            batch,
            batch_opened_at_ms: started_at_ms,
            queued_batches: VecDeque::new(),
            in_flight_batch: None,
            underived_distance_m: 0.0,
        };
        info!(
            "Started ride {} with motor {} at {}",
            session_id, ride.motor.id, start_address
        );
        let motor_id = ride.motor.id.clone();
        self.state = TrackerState::Tracking(Box::new(ride));
        self.publish(EventKind::TrackingStartedEvent(Arc::new(TrackingStarted {
            motor_id,
            start_address,
            started_at_ms,
        })));
        Ok(())
    }

    async fn geocode_or_placeholder(&self, coordinate: &Coordinate) -> String {
        let error = match self.services.geocoder.reverse_geocode(coordinate).await {
            Ok(address) if !address.trim().is_empty() => return address,
            Ok(_) => None,
            Err(e) => Some(e),
        };
        warn!(
            "No address for {:?}, using placeholder. Error: {:?}",
            coordinate, error
        );
        self.publish(EventKind::GeocodingDegradedEvent(Arc::new(GeocodingDegraded {
            placeholder: UNKNOWN_LOCATION.to_string(),
            error,
        })));
        UNKNOWN_LOCATION.to_string()
    }

    /// Feeds a location sample into the running ride.
    ///
    /// Ignored while idle. A jitter sample only updates the current speed,
    /// from its reported speed or `0.0`.
    ///
    /// # Errors
    /// [`Error::Validation`] if the sample is not a valid coordinate.
    pub fn on_location_sample(&mut self, sample: LocationSample) -> Result<()> {
        let now_ms = self.clock.now_ms();
        let jitter = self.jitter;
        let max_route_points = self.config.max_route_points;
        let TrackerState::Tracking(ride) = &mut self.state else {
            debug!("Ignoring location sample while idle");
            return Ok(());
        };
        if !sample.coordinate().is_valid() {
            return Err(Error::validation(format!(
                "Invalid location sample {}/{}",
                sample.latitude, sample.longitude
            )));
        }
        let Some(distance_m) = jitter.accept(ride.last_accepted.as_ref(), &sample) else {
            ride.stats.current_speed_kmh = derive_speed_kmh(None, &sample, 0.0);
            ride.stats.update_duration(now_ms);
            let stats = ride.stats;
            if let Some(stats) = self.stats_throttle.offer(stats, now_ms) {
                self.publish(EventKind::RideStatsEvent(Arc::new(stats)));
            }
            return Ok(());
        };

        ride.stats.distance_meters += distance_m;
        ride.stats.current_speed_kmh =
            derive_speed_kmh(ride.last_accepted.as_ref(), &sample, distance_m);
        ride.stats.update_duration(now_ms);
        ride.underived_distance_m += distance_m;
        ride.last_accepted = Some(sample);
        if ride.start_location.is_none() {
            ride.start_location = Some(sample);
        }
        push_capped(&mut ride.raw_route, sample, max_route_points);
        if ride.batch.is_empty() {
            ride.batch_opened_at_ms = now_ms;
        }
        ride.batch.push(sample);
        let stats = ride.stats;

        if let Some(stats) = self.stats_throttle.offer(stats, now_ms) {
            self.publish(EventKind::RideStatsEvent(Arc::new(stats)));
        }
        if self.batch_window_closed(now_ms) {
            self.close_batch();
        }
        Ok(())
    }

    fn batch_window_closed(&self, now_ms: i64) -> bool {
        self.ride().is_some_and(|ride| {
            !ride.batch.is_empty()
                && (ride.batch.len() >= self.config.snap_batch_size
                    || now_ms - ride.batch_opened_at_ms >= self.config.snap_batch_window_ms)
        })
    }

    /// Periodic housekeeping: closes a timed out batch and releases pending statistics.
    pub fn on_tick(&mut self) {
        let now_ms = self.clock.now_ms();
        if let TrackerState::Tracking(ride) = &mut self.state {
            ride.stats.update_duration(now_ms);
        }
        if self.batch_window_closed(now_ms) {
            self.close_batch();
        }
        if let Some(stats) = self.stats_throttle.poll(now_ms) {
            self.publish(EventKind::RideStatsEvent(Arc::new(stats)));
        }
    }

    fn close_batch(&mut self) {
        let TrackerState::Tracking(ride) = &mut self.state else {
            return;
        };
        let batch = std::mem::take(&mut ride.batch);
        debug!("Closed snapping batch with {} samples", batch.len());
        ride.queued_batches.push_back(batch);
        self.derive_fuel();
        self.dispatch_snap();
    }

    fn dispatch_snap(&mut self) {
        let TrackerState::Tracking(ride) = &mut self.state else {
            return;
        };
        if ride.in_flight_batch.is_some() {
            return;
        }
        let Some(batch) = ride.queued_batches.pop_front() else {
            return;
        };
        ride.in_flight_batch = Some(batch.clone());
        let session_id = ride.session_id;
        let snapper = self.services.snapper.clone();
        let tx = self.snap_tx.clone();
        self.snap_task = Some(tokio::spawn(async move {
            let points: Vec<Coordinate> = batch.iter().map(LocationSample::coordinate).collect();
            let result = snapper.snap(&points).await;
            let _ = tx.send(SnapOutcome {
                session_id,
                batch,
                result,
            });
        }));
    }

    /// Waits for the next finished snapping call.
    pub async fn next_snap_outcome(&mut self) -> Option<SnapOutcome> {
        self.snap_rx.recv().await
    }

    /// Appends a snapping result to the snapped route and starts the next
    /// queued batch.
    ///
    /// Returns `false` if the result belongs to a ride that is no longer
    /// tracked, in which case nothing is changed.
    pub fn apply_snap_outcome(&mut self, outcome: SnapOutcome) -> bool {
        let max_route_points = self.config.max_route_points;
        let ride = match &mut self.state {
            TrackerState::Tracking(ride) if ride.session_id == outcome.session_id => ride,
            _ => {
                debug!("Dropping snapping result of ended ride {}", outcome.session_id);
                return false;
            }
        };
        ride.in_flight_batch = None;

        let degraded = match outcome.result {
            Ok(snapped) if !snapped.is_empty() => {
                for sample in stamp_snapped_points(&snapped, &outcome.batch) {
                    push_capped(&mut ride.snapped_route, sample, max_route_points);
                }
                None
            }
            Ok(_) => Some(SnappingDegradedReason::NoRoadMatch),
            Err(e) => Some(SnappingDegradedReason::ServiceError(e)),
        };
        if let Some(reason) = degraded {
            warn!(
                "Snapping degraded for {} samples: {:?}",
                outcome.batch.len(),
                reason
            );
            for sample in &outcome.batch {
                push_capped(&mut ride.snapped_route, *sample, max_route_points);
            }
            self.publish(EventKind::SnappingDegradedEvent(Arc::new(SnappingDegraded {
                reason,
                batch_len: outcome.batch.len(),
            })));
        }
        self.dispatch_snap();
        true
    }

    /// Derives a fuel level for the distance driven since the last derivation.
    fn derive_fuel(&mut self) {
        let TrackerState::Tracking(ride) = &mut self.state else {
            return;
        };
        if ride.underived_distance_m <= 0.0 {
            return;
        }
        let incremental_km = ride.underived_distance_m / 1000.0;
        ride.underived_distance_m = 0.0;
        let motor_id = ride.motor.id.clone();

        match derive_fuel_level(
            ride.motor.current_fuel_level,
            incremental_km,
            ride.motor.total_drivable_distance_km,
        ) {
            Ok(FuelDerivation::Level(level)) => {
                ride.motor.current_fuel_level = level;
                debug!(
                    "Derived fuel level {:.2} for motor {} after {:.3} km",
                    level, motor_id, incremental_km
                );
                if let Some(store) = &self.store {
                    if let Err(e) = store.mutate_vehicle_locally(&motor_id, MotorPatch::fuel_level(level)) {
                        warn!("Failed to patch motor {} locally. Error: {}", motor_id, e);
                    }
                }
                self.publish(EventKind::FuelLevelUpdatedEvent(Arc::new(FuelLevel {
                    motor_id: motor_id.clone(),
                    level,
                })));
                self.queue_fuel_update(FuelJob { motor_id, level });
            }
            Ok(FuelDerivation::Skipped) => {
                info!("Motor {} has no drivable range, skipping fuel update", motor_id);
                self.publish(EventKind::FuelUpdateSkippedEvent(Arc::new(motor_id)));
            }
            Err(e) => error!("Fuel derivation for motor {} failed. Error: {}", motor_id, e),
        }
    }

    fn queue_fuel_update(&mut self, job: FuelJob) {
        if self.fuel_worker.is_none() {
            self.fuel_worker = Some(self.spawn_fuel_worker());
        }
        let sent = self
            .fuel_worker
            .as_ref()
            .is_some_and(|worker| worker.queue.send(job).is_ok());
        if !sent {
            error!("Fuel update worker is gone, update dropped");
        }
    }

    /// Spawns the worker delivering fuel updates in derivation order.
    fn spawn_fuel_worker(&self) -> FuelWorker {
        let (queue, mut jobs) = mpsc::unbounded_channel::<FuelJob>();
        let updater = self.services.fuel_updater.clone();
        let policy = self.config.retry;
        let sender = self.sender.clone();
        let handle = tokio::spawn(async move {
            while let Some(job) = jobs.recv().await {
                let updater = &updater;
                let motor_id = job.motor_id.as_str();
                let level = job.level;
                let result = policy
                    .run("fuel update", move || updater.update_fuel_level(motor_id, level))
                    .await;
                if let Err(error) = result {
                    error!("Fuel update for motor {} failed. Error: {}", motor_id, error);
                    let _ = sender.send(Event {
                        kind: EventKind::FuelUpdateFailedEvent(Arc::new(FuelUpdateFailed {
                            motor_id: job.motor_id.clone(),
                            level,
                            error,
                        })),
                    });
                }
            }
        });
        FuelWorker { queue, handle }
    }

    /// Stops the ride and persists its summary.
    ///
    /// Returns `Ok(None)` when no ride is tracked and the trip id otherwise.
    /// On a persistence failure a [`TripSaveFailed`] event carrying the
    /// summary is published and the error is returned. The tracker is idle
    /// in every case.
    pub async fn stop(&mut self) -> Result<Option<String>> {
        if !self.is_tracking() {
            debug!("Nothing to stop");
            return Ok(None);
        }
        // Closing the open batch derives the fuel for the remaining distance.
        if self.ride().is_some_and(|ride| !ride.batch.is_empty()) {
            let TrackerState::Tracking(ride) = &mut self.state else {
                return Ok(None);
            };
            let batch = std::mem::take(&mut ride.batch);
            ride.queued_batches.push_back(batch);
        }
        self.derive_fuel();

        let TrackerState::Tracking(ride) = std::mem::replace(&mut self.state, TrackerState::Idle)
        else {
            return Ok(None);
        };
        let mut ride = *ride;
        let unsnapped = ride
            .in_flight_batch
            .take()
            .into_iter()
            .chain(ride.queued_batches.drain(..))
            .flatten()
            .collect::<Vec<_>>();
        for sample in unsnapped {
            push_capped(&mut ride.snapped_route, sample, self.config.max_route_points);
        }

        let end_location = ride.last_accepted.or(ride.start_location);
        let end_address = match &end_location {
            Some(location) => self.geocode_or_placeholder(&location.coordinate()).await,
            None => UNKNOWN_LOCATION.to_string(),
        };
        let ended_at_ms = self.clock.now_ms();
        ride.stats.update_duration(ended_at_ms);
        let summary = TripSummary {
            motor_id: ride.motor.id.clone(),
            start_location: ride.start_location,
            end_location,
            start_address: ride.start_address.clone(),
            end_address,
            distance_meters: ride.stats.distance_meters,
            duration_ms: ride.stats.duration_ms,
            average_speed_kmh: ride.stats.average_speed_kmh(),
            started_at_ms: ride.stats.started_at_ms,
            ended_at_ms,
            route_coordinates: ride.raw_route.into_iter().collect(),
            snapped_route_coordinates: ride.snapped_route.into_iter().collect(),
        };
        info!(
            "Stopped ride {} after {:.3} km",
            ride.session_id,
            summary.distance_km()
        );
        self.save_trip(summary).await.map(Some)
    }

    /// Persists `summary` with the retry policy.
    ///
    /// Used by [`TripTracker::stop`] and for a manual retry after a
    /// [`TripSaveFailed`] event.
    pub async fn save_trip(&self, summary: TripSummary) -> Result<String> {
        let trips = &self.services.trips;
        let summary_ref = &summary;
        let result = self
            .config
            .retry
            .run("save trip", move || trips.save_trip(summary_ref))
            .await;
        match result {
            Ok(trip_id) => {
                info!("Saved trip {}", trip_id);
                if let Some(store) = &self.store {
                    if let Some(user_id) = store.active_user() {
                        store.invalidate(&user_id, CollectionSelector::All);
                    }
                }
                self.publish(EventKind::TripSavedEvent(Arc::new(TripSaved {
                    trip_id: trip_id.clone(),
                    summary: Arc::new(summary),
                })));
                Ok(trip_id)
            }
            Err(error) => {
                error!("Saving trip failed. Error: {}", error);
                self.publish(EventKind::TripSaveFailedEvent(Arc::new(TripSaveFailed {
                    summary: Arc::new(summary),
                    error: error.clone(),
                })));
                Err(error)
            }
        }
    }

    /// Delivers the queued fuel updates and stops the fuel worker.
    ///
    /// Waits at most `timeout` for the queue to drain.
    pub async fn shutdown(&mut self, timeout: Duration) {
        if let Some(task) = self.snap_task.take() {
            task.abort();
        }
        let Some(FuelWorker { queue, mut handle }) = self.fuel_worker.take() else {
            return;
        };
        drop(queue);
        if tokio::time::timeout(timeout, &mut handle).await.is_err() {
            warn!("Fuel updates still pending at shutdown, dropping them");
            handle.abort();
        }
    }
}

impl Drop for TripTracker {
    fn drop(&mut self) {
        if let Some(task) = self.snap_task.take() {
            task.abort();
        }
        if let Some(worker) = self.fuel_worker.take() {
            worker.handle.abort();
        }
    }
}
