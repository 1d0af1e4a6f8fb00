// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{
    collections::{CollectionName, GasStation, Report, UserProfile},
    vehicle::{Motor, MotorPatch},
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::warn;

/// In-memory copy of one collection together with its refresh bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedCollection<T> {
    pub items: Vec<T>,
    /// `true` while the items are the ones read from persistent storage.
    pub loaded_from_cache: bool,
    pub last_refresh_started_at_ms: Option<i64>,
    /// Completion time of the last successful refresh. Reset by invalidation.
    pub last_refreshed_at_ms: Option<i64>,
}

impl<T> Default for CachedCollection<T> {
    fn default() -> Self {
        CachedCollection {
            items: Vec::new(),
            loaded_from_cache: false,
            last_refresh_started_at_ms: None,
            last_refreshed_at_ms: None,
        }
    }
}

impl<T> CachedCollection<T> {
    pub fn from_cache(items: Vec<T>) -> Self {
        CachedCollection {
            items,
            loaded_from_cache: true,
            ..Default::default()
        }
    }

    /// Replaces the items wholesale with the result of a refresh.
    pub fn replace(&mut self, items: Vec<T>, now_ms: i64) {
        self.items = items;
        self.loaded_from_cache = false;
        self.last_refreshed_at_ms = Some(now_ms);
    }

    fn state(&self, name: CollectionName, in_flight: bool) -> CollectionState {
        CollectionState {
            name,
            len: self.items.len(),
            loaded_from_cache: self.loaded_from_cache,
            last_refresh_started_at_ms: self.last_refresh_started_at_ms,
            last_refreshed_at_ms: self.last_refreshed_at_ms,
            in_flight,
        }
    }
}

/// Observable bookkeeping of a collection, see [`crate::DomainStore::collection_state`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionState {
    pub name: CollectionName,
    pub len: usize,
    pub loaded_from_cache: bool,
    pub last_refresh_started_at_ms: Option<i64>,
    pub last_refreshed_at_ms: Option<i64>,
    pub in_flight: bool,
}

/// Result of a refresh request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The collection was replaced with the given number of items.
    Refreshed(usize),
    /// A refresh of the same collection for the same user is still running.
    AlreadyInFlight,
    /// The last successful refresh is younger than the stale window.
    Fresh,
    /// The user session was torn down or the collection invalidated while
    /// the request was running.
    Discarded,
}

/// All collections and the active user, read under a single lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub active_user: Option<String>,
    pub reports: Vec<Report>,
    pub stations: Vec<GasStation>,
    /// Motors with the local overlay applied.
    pub motors: Vec<Motor>,
    pub profile: Option<UserProfile>,
}

/// A freshly fetched collection on its way into the store.
pub(crate) enum Fetched {
    Reports(Vec<Report>),
    Stations(Vec<GasStation>),
    Motors(Vec<Motor>),
    Profile(Option<UserProfile>),
}

impl Fetched {
    pub(crate) fn len(&self) -> usize {
        match self {
            Fetched::Reports(items) => items.len(),
            Fetched::Stations(items) => items.len(),
            Fetched::Motors(items) => items.len(),
            Fetched::Profile(profile) => usize::from(profile.is_some()),
        }
    }

    /// JSON blob written to persistent storage.
    pub(crate) fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Fetched::Reports(items) => serde_json::to_string(items),
            Fetched::Stations(items) => serde_json::to_string(items),
            Fetched::Motors(items) => serde_json::to_string(items),
            Fetched::Profile(profile) => serde_json::to_string(profile),
        }
    }
}

/// The four collections plus the optimistic overlay on motors.
#[derive(Debug, Clone, Default)]
pub(crate) struct Collections {
    pub reports: CachedCollection<Report>,
    pub stations: CachedCollection<GasStation>,
    pub motors: CachedCollection<Motor>,
    pub profile: CachedCollection<UserProfile>,
    pub motor_overlay: HashMap<String, MotorPatch>,
}

impl Collections {
    /// Builds the collections from the raw persisted blobs.
    ///
    /// Missing or malformed blobs become empty collections.
    pub(crate) fn from_blobs(
        reports: Option<String>,
        stations: Option<String>,
        motors: Option<String>,
        profile: Option<String>,
    ) -> Self {
        let profile = parse_blob::<Option<UserProfile>>(CollectionName::Profile, profile)
            .flatten()
            .into_iter()
            .collect();
        Collections {
            reports: CachedCollection::from_cache(parse_list(CollectionName::Reports, reports)),
            stations: CachedCollection::from_cache(parse_list(CollectionName::Stations, stations)),
            motors: CachedCollection::from_cache(parse_list(CollectionName::Motors, motors)),
            profile: CachedCollection::from_cache(profile),
            motor_overlay: HashMap::new(),
        }
    }

    pub(crate) fn apply(&mut self, fetched: Fetched, now_ms: i64) {
        match fetched {
            Fetched::Reports(items) => self.reports.replace(items, now_ms),
            Fetched::Stations(items) => self.stations.replace(items, now_ms),
            Fetched::Motors(items) => {
                self.motors.replace(items, now_ms);
                self.motor_overlay.clear();
            }
            Fetched::Profile(profile) => self.profile.replace(profile.into_iter().collect(), now_ms),
        }
    }

    pub(crate) fn mark_refresh_started(&mut self, name: CollectionName, now_ms: i64) {
        match name {
            CollectionName::Reports => self.reports.last_refresh_started_at_ms = Some(now_ms),
            CollectionName::Stations => self.stations.last_refresh_started_at_ms = Some(now_ms),
            CollectionName::Motors => self.motors.last_refresh_started_at_ms = Some(now_ms),
            CollectionName::Profile => self.profile.last_refresh_started_at_ms = Some(now_ms),
        }
    }

    pub(crate) fn last_refreshed_at_ms(&self, name: CollectionName) -> Option<i64> {
        match name {
            CollectionName::Reports => self.reports.last_refreshed_at_ms,
            CollectionName::Stations => self.stations.last_refreshed_at_ms,
            CollectionName::Motors => self.motors.last_refreshed_at_ms,
            CollectionName::Profile => self.profile.last_refreshed_at_ms,
        }
    }

    pub(crate) fn reset_freshness(&mut self, name: CollectionName) {
        match name {
            CollectionName::Reports => self.reports.last_refreshed_at_ms = None,
            CollectionName::Stations => self.stations.last_refreshed_at_ms = None,
            CollectionName::Motors => self.motors.last_refreshed_at_ms = None,
            CollectionName::Profile => self.profile.last_refreshed_at_ms = None,
        }
    }

    pub(crate) fn state(&self, name: CollectionName, in_flight: bool) -> CollectionState {
        match name {
            CollectionName::Reports => self.reports.state(name, in_flight),
            CollectionName::Stations => self.stations.state(name, in_flight),
            CollectionName::Motors => self.motors.state(name, in_flight),
            CollectionName::Profile => self.profile.state(name, in_flight),
        }
    }

    /// Motors with the overlay applied.
    pub(crate) fn motors(&self) -> Vec<Motor> {
        self.motors
            .items
            .iter()
            .map(|motor| match self.motor_overlay.get(&motor.id) {
                Some(patch) => motor.patched(patch),
                None => motor.clone(),
            })
            .collect()
    }
}

fn parse_blob<T: DeserializeOwned>(name: CollectionName, blob: Option<String>) -> Option<T> {
    let blob = blob?;
    match serde_json::from_str::<T>(&blob) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring malformed cache of {}. Error: {}", name, e);
            None
        }
    }
}

fn parse_list<T: DeserializeOwned>(name: CollectionName, blob: Option<String>) -> Vec<T> {
    parse_blob::<Vec<T>>(name, blob).unwrap_or_default()
}
