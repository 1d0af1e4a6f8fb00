// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

#![allow(dead_code)]

use api::{DomainApi, FuelUpdater, ReverseGeocoder, RoadSnapper, TripRepository};
use async_trait::async_trait;
use common::{
    collections::{GasStation, Report, UserProfile},
    error::{Error, Result},
    position::Coordinate,
    test_helper::{manual_clock::ManualClock, ride::get_motor},
    trip::TripSummary,
    vehicle::Motor,
};
use domain_store::{DomainStore, StoreConfig};
use module_core::EventBus;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};
use storage::MemoryStorage;
use tokio::sync::Semaphore;
use trip_tracker::{TrackerConfig, TrackerServices, TripTracker};

pub const START_TIME_MS: i64 = 1_700_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapMode {
    /// Returns the input points unchanged.
    Echo,
    /// Returns only the first and the last point.
    Thin,
    /// No road matched.
    Empty,
    Fail,
}

pub struct MockSnapper {
    mode: Mutex<SnapMode>,
    calls: Mutex<Vec<Vec<Coordinate>>>,
    gate: Semaphore,
}

impl MockSnapper {
    pub fn new(mode: SnapMode) -> Self {
        MockSnapper {
            mode: Mutex::new(mode),
            calls: Mutex::new(Vec::new()),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
        }
    }

    /// A snapper whose calls wait until [`MockSnapper::open_gate`].
    pub fn gated(mode: SnapMode) -> Self {
        MockSnapper {
            gate: Semaphore::new(0),
            ..Self::new(mode)
        }
    }

    pub fn open_gate(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn calls(&self) -> Vec<Vec<Coordinate>> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn wait_for_calls(&self, count: usize) {
        tokio::time::timeout(Duration::from_millis(500), async {
            while self.calls.lock().unwrap().len() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("Expected snapping call was not made");
    }
}

#[async_trait]
impl RoadSnapper for MockSnapper {
    async fn snap(&self, points: &[Coordinate]) -> Result<Vec<Coordinate>> {
        self.calls.lock().unwrap().push(points.to_vec());
        let _permit = self.gate.acquire().await.unwrap();
        let mode = *self.mode.lock().unwrap();
        match mode {
            SnapMode::Echo => Ok(points.to_vec()),
            SnapMode::Thin => Ok(points
                .first()
                .into_iter()
                .chain(points.last())
                .copied()
                .collect()),
            SnapMode::Empty => Ok(vec![]),
            SnapMode::Fail => Err(Error::transient("snapping service unavailable")),
        }
    }
}

pub struct MockGeocoder {
    fail: bool,
}

impl MockGeocoder {
    pub fn new() -> Self {
        MockGeocoder { fail: false }
    }

    pub fn failing() -> Self {
        MockGeocoder { fail: true }
    }
}

pub fn address_of(coordinate: &Coordinate) -> String {
    format!("Road at {:.4}/{:.4}", coordinate.latitude, coordinate.longitude)
}

#[async_trait]
impl ReverseGeocoder for MockGeocoder {
    async fn reverse_geocode(&self, coordinate: &Coordinate) -> Result<String> {
        if self.fail {
            return Err(Error::transient("geocoder timeout"));
        }
        Ok(address_of(coordinate))
    }
}

/// Fuel updater recording every attempt.
pub struct MockFuelUpdater {
    attempts: Mutex<Vec<(String, f64)>>,
    failures: Mutex<VecDeque<Error>>,
}

impl MockFuelUpdater {
    pub fn new() -> Self {
        MockFuelUpdater {
            attempts: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// The next calls fail with `errors`, in order.
    pub fn fail_with(&self, errors: Vec<Error>) {
        self.failures.lock().unwrap().extend(errors);
    }

    pub fn attempts(&self) -> Vec<(String, f64)> {
        self.attempts.lock().unwrap().clone()
    }

    pub async fn wait_for_attempts(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.attempts.lock().unwrap().len() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("Expected fuel update was not made");
    }
}

#[async_trait]
impl FuelUpdater for MockFuelUpdater {
    async fn update_fuel_level(&self, motor_id: &str, fuel_level: f64) -> Result<()> {
        self.attempts
            .lock()
            .unwrap()
            .push((motor_id.to_string(), fuel_level));
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Trip repository recording every attempt.
pub struct MockTripRepository {
    attempts: Mutex<Vec<TripSummary>>,
    failures: Mutex<VecDeque<Error>>,
}

impl MockTripRepository {
    pub fn new() -> Self {
        MockTripRepository {
            attempts: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn fail_with(&self, errors: Vec<Error>) {
        self.failures.lock().unwrap().extend(errors);
    }

    pub fn attempts(&self) -> Vec<TripSummary> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TripRepository for MockTripRepository {
    async fn save_trip(&self, summary: &TripSummary) -> Result<String> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(summary.clone());
            attempts.len()
        };
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(format!("trip-{}", attempt)),
        }
    }
}

/// Domain API serving a single motor.
pub struct StaticDomainApi {
    pub motor: Motor,
}

#[async_trait]
impl DomainApi for StaticDomainApi {
    async fn fetch_reports(&self, _user_id: &str) -> Result<Vec<Report>> {
        Ok(vec![])
    }

    async fn fetch_stations(&self, _user_id: &str) -> Result<Vec<GasStation>> {
        Ok(vec![])
    }

    async fn fetch_motors(&self, _user_id: &str) -> Result<Vec<Motor>> {
        Ok(vec![self.motor.clone()])
    }

    async fn fetch_profile(&self, _user_id: &str) -> Result<Option<UserProfile>> {
        Ok(None)
    }
}

pub struct Harness {
    pub event_bus: EventBus,
    pub clock: ManualClock,
    pub snapper: Arc<MockSnapper>,
    pub geocoder: Arc<MockGeocoder>,
    pub fuel: Arc<MockFuelUpdater>,
    pub trips: Arc<MockTripRepository>,
    pub store: Option<Arc<DomainStore>>,
}

impl Harness {
    pub fn new(snapper: MockSnapper) -> Self {
        Self::with_geocoder(snapper, MockGeocoder::new())
    }

    pub fn with_geocoder(snapper: MockSnapper, geocoder: MockGeocoder) -> Self {
        Harness {
            event_bus: EventBus::default(),
            clock: ManualClock::new(START_TIME_MS),
            snapper: Arc::new(snapper),
            geocoder: Arc::new(geocoder),
            fuel: Arc::new(MockFuelUpdater::new()),
            trips: Arc::new(MockTripRepository::new()),
            store: None,
        }
    }

    /// Adds a domain store holding the cached motors of `user-1`.
    pub async fn with_store(mut self, stale_after_ms: i64) -> Self {
        let motor = get_motor(80.0, Some(50.0));
        let blob = serde_json::to_string(&vec![motor.clone()]).unwrap();
        let storage = MemoryStorage::with_entries(&[("cache_motors_user-1", blob.as_str())]);
        let store = Arc::new(DomainStore::new(
            Arc::new(storage),
            Arc::new(StaticDomainApi { motor }),
            self.event_bus.sender(),
            StoreConfig { stale_after_ms },
            Arc::new(self.clock.clone()),
        ));
        store.load_from_persistent_storage("user-1").await;
        self.store = Some(store);
        self
    }

    pub fn tracker(&self, config: TrackerConfig) -> TripTracker {
        TripTracker::new(
            TrackerServices {
                snapper: self.snapper.clone(),
                geocoder: self.geocoder.clone(),
                fuel_updater: self.fuel.clone(),
                trips: self.trips.clone(),
            },
            self.store.clone(),
            config,
            Arc::new(self.clock.clone()),
            self.event_bus.sender(),
        )
    }
}

/// Config with small batches and no stats throttling.
pub fn test_config(snap_batch_size: usize) -> TrackerConfig {
    TrackerConfig {
        snap_batch_size,
        stats_interval_ms: 0,
        ..Default::default()
    }
}
