// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

#![allow(dead_code)]

use api::DomainApi;
use async_trait::async_trait;
use common::{
    collections::{CollectionName, GasStation, Report, UserProfile},
    error::{Error, Result},
    test_helper::{
        manual_clock::ManualClock,
        ride::{get_motor, get_profile, get_reports, get_stations},
    },
    vehicle::Motor,
};
use domain_store::{DomainStore, StoreConfig};
use module_core::EventBus;
use std::{
    collections::HashMap,
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use storage::{KeyValueStorage, MemoryStorage};
use tokio::sync::Semaphore;

/// Domain API double counting the calls per collection.
///
/// While the gate is closed every fetch waits after it was counted, which
/// keeps a refresh in flight until the test opens the gate or releases that
/// single call. Motors are read when the call is made.
pub struct MockDomainApi {
    calls: Mutex<HashMap<CollectionName, usize>>,
    gate: Semaphore,
    call_gates: Mutex<HashMap<(CollectionName, usize), Arc<Semaphore>>>,
    fail: AtomicBool,
    motors: Mutex<Vec<Motor>>,
}

impl MockDomainApi {
    pub fn new() -> Self {
        MockDomainApi {
            calls: Mutex::new(HashMap::new()),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
            call_gates: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
            motors: Mutex::new(vec![get_motor(90.0, Some(300.0))]),
        }
    }

    pub fn gated() -> Self {
        MockDomainApi {
            gate: Semaphore::new(0),
            ..Self::new()
        }
    }

    pub fn open_gate(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    /// Lets the `number`th call for `name` complete, counting from 1.
    pub fn release_call(&self, name: CollectionName, number: usize) {
        self.call_gate(name, number).add_permits(1);
    }

    fn call_gate(&self, name: CollectionName, number: usize) -> Arc<Semaphore> {
        self.call_gates
            .lock()
            .unwrap()
            .entry((name, number))
            .or_insert_with(|| Arc::new(Semaphore::new(0)))
            .clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_motors(&self, motors: Vec<Motor>) {
        *self.motors.lock().unwrap() = motors;
    }

    pub fn calls(&self, name: CollectionName) -> usize {
        self.calls.lock().unwrap().get(&name).copied().unwrap_or(0)
    }

    /// Waits until `count` calls for `name` were made.
    pub async fn wait_for_calls(&self, name: CollectionName, count: usize) {
        tokio::time::timeout(Duration::from_millis(500), async {
            while self.calls(name) < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("Expected API call was not made");
    }

    async fn call(&self, name: CollectionName) -> Result<()> {
        let number = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(name).or_default();
            *count += 1;
            *count
        };
        let call_gate = self.call_gate(name, number);
        tokio::select! {
            permit = self.gate.acquire() => drop(permit.unwrap()),
            permit = call_gate.acquire() => drop(permit.unwrap()),
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::transient("service unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl DomainApi for MockDomainApi {
    async fn fetch_reports(&self, _user_id: &str) -> Result<Vec<Report>> {
        self.call(CollectionName::Reports).await?;
        Ok(get_reports())
    }

    async fn fetch_stations(&self, _user_id: &str) -> Result<Vec<GasStation>> {
        self.call(CollectionName::Stations).await?;
        Ok(get_stations())
    }

    async fn fetch_motors(&self, _user_id: &str) -> Result<Vec<Motor>> {
        let motors = self.motors.lock().unwrap().clone();
        self.call(CollectionName::Motors).await?;
        Ok(motors)
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.call(CollectionName::Profile).await?;
        Ok(Some(get_profile(user_id)))
    }
}

/// Storage double counting reads.
#[derive(Clone, Default)]
pub struct CountingStorage {
    pub inner: MemoryStorage,
    reads: Arc<AtomicUsize>,
}

impl CountingStorage {
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        CountingStorage {
            inner: MemoryStorage::with_entries(entries),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStorage for CountingStorage {
    async fn get(&self, key: &str) -> io::Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> io::Result<()> {
        self.inner.remove(key).await
    }
}

/// Cached collections of `user_id` as the store persists them.
pub fn cached_entries(user_id: &str, motor_fuel_level: f64) -> Vec<(String, String)> {
    vec![
        (
            CollectionName::Reports.storage_key(user_id),
            serde_json::to_string(&get_reports()).unwrap(),
        ),
        (
            CollectionName::Stations.storage_key(user_id),
            serde_json::to_string(&get_stations()).unwrap(),
        ),
        (
            CollectionName::Motors.storage_key(user_id),
            serde_json::to_string(&vec![get_motor(motor_fuel_level, Some(250.0))]).unwrap(),
        ),
        (
            CollectionName::Profile.storage_key(user_id),
            serde_json::to_string(&get_profile(user_id)).unwrap(),
        ),
    ]
}

pub fn storage_with_cache(user_id: &str, motor_fuel_level: f64) -> CountingStorage {
    let entries = cached_entries(user_id, motor_fuel_level);
    let entries: Vec<(&str, &str)> = entries
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    CountingStorage::with_entries(&entries)
}

pub struct Fixture {
    pub event_bus: EventBus,
    pub api: Arc<MockDomainApi>,
    pub storage: CountingStorage,
    pub clock: ManualClock,
    pub store: Arc<DomainStore>,
}

pub fn create_store(api: MockDomainApi, storage: CountingStorage, stale_after_ms: i64) -> Fixture {
    let event_bus = EventBus::default();
    let api = Arc::new(api);
    let clock = ManualClock::new(1_700_000_000_000);
    let store = Arc::new(DomainStore::new(
        Arc::new(storage.clone()),
        api.clone(),
        event_bus.sender(),
        StoreConfig { stale_after_ms },
        Arc::new(clock.clone()),
    ));
    Fixture {
        event_bus,
        api,
        storage,
        clock,
        store,
    }
}
