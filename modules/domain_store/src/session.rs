// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::collections::CollectionName;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

/// State owned by one signed-in user.
///
/// Created when the store is loaded for a user and torn down on sign out or
/// when another user signs in. Refresh results that complete after the
/// teardown see `is_alive() == false` and are dropped.
///
/// In-flight refreshes are tracked per collection with a generation token, so
/// the completion of a refresh that was invalidated meanwhile cannot clear the
/// flag of a newer refresh of the same collection.
#[derive(Debug)]
pub struct UserSession {
    user_id: String,
    alive: AtomicBool,
    next_generation: AtomicU64,
    in_flight: Mutex<HashMap<CollectionName, u64>>,
}

impl UserSession {
    pub fn new(user_id: &str) -> Self {
        UserSession {
            user_id: user_id.to_string(),
            alive: AtomicBool::new(true),
            next_generation: AtomicU64::new(1),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn tear_down(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Marks a refresh of `name` as running and returns its generation.
    ///
    /// Returns `None` if a refresh of `name` is already running.
    pub fn try_begin(&self, name: CollectionName) -> Option<u64> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight.contains_key(&name) {
            return None;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        in_flight.insert(name, generation);
        Some(generation)
    }

    /// Clears the flag of `name` if it still belongs to `generation`.
    pub fn finish(&self, name: CollectionName, generation: u64) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight.get(&name) == Some(&generation) {
            in_flight.remove(&name);
        }
    }

    /// Returns `true` if `generation` is the running refresh of `name`.
    ///
    /// Turns `false` once `name` was invalidated or the session torn down.
    pub fn is_current_generation(&self, name: CollectionName, generation: u64) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&name)
            == Some(&generation)
    }

    pub fn clear(&self, name: CollectionName) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&name);
    }

    pub fn is_in_flight(&self, name: CollectionName) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&name)
    }
}
