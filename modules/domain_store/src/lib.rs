// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Domain Store Modul for the ride tracker
//!
//! Keeps locally persisted copies of the reports, gas stations, motors and
//! profile collections of the signed-in user and reconciles them with network
//! refreshes. Cached values are readable synchronously at any time, at most one
//! refresh per collection is running and updating the cache never triggers a
//! further refresh.

use api::DomainApi;
use common::{
    clock::Clock,
    collections::{CollectionName, CollectionSelector, GasStation, Report, UserProfile},
    error::{Error, Result},
    vehicle::{Motor, MotorPatch},
};
use futures::future::join_all;
use module_core::{Event, EventKind};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use storage::KeyValueStorage;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

mod collection;
mod session;

pub use collection::{CachedCollection, CollectionState, RefreshOutcome, StoreSnapshot};
pub use session::UserSession;

use collection::{Collections, Fetched};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// A refresh requested less than this many milliseconds after the last
    /// successful one is answered with [`RefreshOutcome::Fresh`]. `0` disables
    /// the window.
    pub stale_after_ms: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            stale_after_ms: 30_000,
        }
    }
}

#[derive(Default)]
struct StoreState {
    active_user: Option<String>,
    /// User `initialize` ran for, set before any await.
    initialized_for: Option<String>,
    session: Option<Arc<UserSession>>,
    collections: Collections,
}

impl StoreState {
    /// Returns the live session of `user_id`.
    fn session_of(&self, user_id: &str) -> Option<Arc<UserSession>> {
        self.session
            .as_ref()
            .filter(|session| session.user_id() == user_id && session.is_alive())
            .cloned()
    }

    fn is_current(&self, session: &Arc<UserSession>) -> bool {
        session.is_alive()
            && self
                .session
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, session))
    }

    fn tear_down(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Tearing down session of user {}", session.user_id());
            session.tear_down();
        }
        self.active_user = None;
        self.initialized_for = None;
        self.collections = Collections::default();
    }
}

/// Cached Domain Store.
///
/// All reads are served from memory. Readers get owned copies and never see
/// a partially applied update, every mutation happens inside one write lock
/// that is never held across an await.
pub struct DomainStore {
    storage: Arc<dyn KeyValueStorage>,
    api: Arc<dyn DomainApi>,
    sender: broadcast::Sender<Event>,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    state: RwLock<StoreState>,
}

impl DomainStore {
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        api: Arc<dyn DomainApi>,
        sender: broadcast::Sender<Event>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        DomainStore {
            storage,
            api,
            sender,
            config,
            clock,
            state: RwLock::new(StoreState::default()),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, kind: EventKind) {
        let _ = self.sender.send(Event { kind });
    }

    /// Loads the cache of `user_id` and refreshes all collections.
    ///
    /// Runs at most once per signed-in identity. Calling it again for the same
    /// user does nothing, calling it for another user tears the previous
    /// session down first. Refresh failures are logged and leave the cached
    /// data in place.
    pub async fn initialize(&self, user_id: &str) -> Result<()> {
        if user_id.is_empty() {
            return Err(Error::validation("User id must not be empty"));
        }
        {
            let mut state = self.write_state();
            if state.initialized_for.as_deref() == Some(user_id) {
                debug!("Store already initialized for user {}", user_id);
                return Ok(());
            }
            if state
                .session
                .as_ref()
                .is_some_and(|session| session.user_id() != user_id)
            {
                state.tear_down();
            }
            state.initialized_for = Some(user_id.to_string());
        }
        info!("Initializing store for user {}", user_id);
        self.load_from_persistent_storage(user_id).await;
        self.refresh_all(user_id).await;
        Ok(())
    }

    /// Reads the persisted collections of `user_id` and publishes them
    /// together with the active user in one state update.
    ///
    /// Missing or malformed blobs and storage failures yield empty
    /// collections. Opens a session for `user_id` if none is live.
    pub async fn load_from_persistent_storage(&self, user_id: &str) {
        let session = self.open_session(user_id);

        let (reports, stations, motors, profile) = tokio::join!(
            self.read_blob(CollectionName::Reports, user_id),
            self.read_blob(CollectionName::Stations, user_id),
            self.read_blob(CollectionName::Motors, user_id),
            self.read_blob(CollectionName::Profile, user_id),
        );
        let collections = Collections::from_blobs(reports, stations, motors, profile);

        {
            let mut state = self.write_state();
            if !state.is_current(&session) {
                debug!("Dropping cache of user {}, session ended", user_id);
                return;
            }
            state.collections = collections;
            state.active_user = Some(user_id.to_string());
        }
        debug!("Loaded cached collections of user {}", user_id);
        for name in CollectionName::ALL {
            self.publish(EventKind::CollectionUpdatedEvent(name));
        }
        self.publish(EventKind::ActiveUserChangedEvent(Some(Arc::new(
            user_id.to_string(),
        ))));
    }

    fn open_session(&self, user_id: &str) -> Arc<UserSession> {
        let mut state = self.write_state();
        if let Some(session) = state.session_of(user_id) {
            return session;
        }
        if state.session.is_some() {
            let initialized_for = state
                .initialized_for
                .take()
                .filter(|initialized| initialized == user_id);
            state.tear_down();
            state.initialized_for = initialized_for;
        }
        let session = Arc::new(UserSession::new(user_id));
        state.session = Some(session.clone());
        session
    }

    async fn read_blob(&self, name: CollectionName, user_id: &str) -> Option<String> {
        let key = name.storage_key(user_id);
        match self.storage.get(&key).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Failed to read {} from storage. Error: {}", key, e);
                None
            }
        }
    }

    /// Refreshes all four collections concurrently and returns the individual results.
    pub async fn refresh_all(&self, user_id: &str) -> Vec<(CollectionName, Result<RefreshOutcome>)> {
        let results = join_all(
            CollectionName::ALL
                .into_iter()
                .map(|name| async move { (name, self.refresh(user_id, name).await) }),
        )
        .await;
        for (name, result) in &results {
            if let Err(e) = result {
                error!("Refresh of {} for user {} failed. Error: {}", name, user_id, e);
            }
        }
        results
    }

    /// Fetches collection `name` for `user_id` and replaces it wholesale.
    ///
    /// Does not contact the network if a refresh of the same collection is
    /// running or the last one is still fresh. On failure the collection keeps
    /// its content and the error is returned. Fails with
    /// [`Error::InvalidState`] if no session of `user_id` is live.
    pub async fn refresh(&self, user_id: &str, name: CollectionName) -> Result<RefreshOutcome> {
        let now_ms = self.clock.now_ms();
        let (session, generation) = {
            let mut state = self.write_state();
            let Some(session) = state.session_of(user_id) else {
                return Err(Error::invalid_state(format!(
                    "No active session for user {}",
                    user_id
                )));
            };
            if session.is_in_flight(name) {
                debug!("Refresh of {} for user {} already in flight", name, user_id);
                return Ok(RefreshOutcome::AlreadyInFlight);
            }
            if let Some(refreshed_at_ms) = state.collections.last_refreshed_at_ms(name) {
                if now_ms - refreshed_at_ms < self.config.stale_after_ms {
                    debug!("{} of user {} is fresh", name, user_id);
                    return Ok(RefreshOutcome::Fresh);
                }
            }
            let Some(generation) = session.try_begin(name) else {
                return Ok(RefreshOutcome::AlreadyInFlight);
            };
            state.collections.mark_refresh_started(name, now_ms);
            (session, generation)
        };

        let result = self.fetch(user_id, name).await;
        let outcome = match result {
            Ok(fetched) => self.apply(&session, name, generation, fetched).await,
            Err(e) => {
                warn!("Refresh of {} for user {} failed. Error: {}", name, user_id, e);
                Err(e)
            }
        };
        session.finish(name, generation);
        outcome
    }

    async fn fetch(&self, user_id: &str, name: CollectionName) -> Result<Fetched> {
        Ok(match name {
            CollectionName::Reports => Fetched::Reports(self.api.fetch_reports(user_id).await?),
            CollectionName::Stations => Fetched::Stations(self.api.fetch_stations(user_id).await?),
            CollectionName::Motors => Fetched::Motors(self.api.fetch_motors(user_id).await?),
            CollectionName::Profile => Fetched::Profile(self.api.fetch_profile(user_id).await?),
        })
    }

    async fn apply(
        &self,
        session: &Arc<UserSession>,
        name: CollectionName,
        generation: u64,
        fetched: Fetched,
    ) -> Result<RefreshOutcome> {
        let len = fetched.len();
        let blob = fetched.to_json();
        {
            let mut state = self.write_state();
            if !state.is_current(session) {
                debug!(
                    "Discarding refresh of {} for user {}, session ended",
                    name,
                    session.user_id()
                );
                return Ok(RefreshOutcome::Discarded);
            }
            if !session.is_current_generation(name, generation) {
                debug!(
                    "Discarding refresh of {} for user {}, collection was invalidated",
                    name,
                    session.user_id()
                );
                return Ok(RefreshOutcome::Discarded);
            }
            state.collections.apply(fetched, self.clock.now_ms());
        }
        info!(
            "Refreshed {} for user {} with {} items",
            name,
            session.user_id(),
            len
        );

        let key = name.storage_key(session.user_id());
        match blob {
            Ok(blob) => {
                if let Err(e) = self.storage.set(&key, &blob).await {
                    warn!("Failed to persist {}. Error: {}", key, e);
                }
            }
            Err(e) => warn!("Failed to serialize {}. Error: {}", key, e),
        }
        self.publish(EventKind::CollectionUpdatedEvent(name));
        Ok(RefreshOutcome::Refreshed(len))
    }

    /// Clears the in-flight flags and the freshness of the selected
    /// collections so the next refresh goes to the network. Does not refresh.
    ///
    /// Refreshes of these collections that are still running are discarded
    /// when they complete.
    pub fn invalidate(&self, user_id: &str, selector: CollectionSelector) {
        let mut state = self.write_state();
        let Some(session) = state.session_of(user_id) else {
            debug!("Ignoring invalidation for inactive user {}", user_id);
            return;
        };
        for name in selector.names() {
            session.clear(name);
            state.collections.reset_freshness(name);
        }
        debug!("Invalidated {:?} for user {}", selector, user_id);
    }

    /// Applies `patch` to the motor `vehicle_id` as an in-memory overlay.
    ///
    /// The overlay is not persisted and is dropped by the next successful
    /// refresh of the motors collection.
    pub fn mutate_vehicle_locally(&self, vehicle_id: &str, patch: MotorPatch) -> Result<()> {
        if let Some(level) = patch.current_fuel_level {
            algorithm::validate_fuel_level(level)?;
        }
        {
            let mut state = self.write_state();
            let overlay = &mut state.collections.motor_overlay;
            let merged = match overlay.get(vehicle_id) {
                Some(existing) => existing.merge(&patch),
                None => patch,
            };
            overlay.insert(vehicle_id.to_string(), merged);
        }
        debug!("Patched motor {} locally", vehicle_id);
        self.publish(EventKind::CollectionUpdatedEvent(CollectionName::Motors));
        Ok(())
    }

    /// Tears the session of the active user down and clears all in-memory
    /// collections. Persisted blobs are kept.
    pub fn sign_out(&self) {
        let user = {
            let mut state = self.write_state();
            let user = state.active_user.clone();
            state.tear_down();
            user
        };
        info!("Signed out user {:?}", user);
        self.publish(EventKind::ActiveUserChangedEvent(None));
    }

    pub fn active_user(&self) -> Option<String> {
        self.read_state().active_user.clone()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.read_state().collections.reports.items.clone()
    }

    pub fn stations(&self) -> Vec<GasStation> {
        self.read_state().collections.stations.items.clone()
    }

    /// Motors with local patches applied.
    pub fn motors(&self) -> Vec<Motor> {
        self.read_state().collections.motors()
    }

    pub fn motor(&self, vehicle_id: &str) -> Option<Motor> {
        self.motors()
            .into_iter()
            .find(|motor| motor.id == vehicle_id)
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.read_state().collections.profile.items.first().cloned()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.read_state();
        StoreSnapshot {
            active_user: state.active_user.clone(),
            reports: state.collections.reports.items.clone(),
            stations: state.collections.stations.items.clone(),
            motors: state.collections.motors(),
            profile: state.collections.profile.items.first().cloned(),
        }
    }

    pub fn collection_state(&self, name: CollectionName) -> CollectionState {
        let state = self.read_state();
        let in_flight = state
            .session
            .as_ref()
            .is_some_and(|session| session.is_in_flight(name));
        state.collections.state(name, in_flight)
    }
}

#[cfg(test)]
mod tests;
