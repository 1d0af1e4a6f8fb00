// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! API Modul for the ride tracker
//!
//! Defines the remote collaborators the trip tracker and the domain store talk
//! to, the retry policy applied to session ending calls and an HTTP
//! implementation of all collaborators on top of `reqwest`.

use async_trait::async_trait;
use common::{
    collections::{GasStation, Report, UserProfile},
    error::Result,
    position::Coordinate,
    trip::TripSummary,
    vehicle::Motor,
};

pub mod config;
pub mod http;
pub mod retry;
pub mod token;

pub use config::ApiConfig;
pub use http::HttpApiClient;
pub use retry::RetryPolicy;
pub use token::AuthTokenSource;

/// Projects raw coordinates onto the nearest known road geometry.
#[async_trait]
pub trait RoadSnapper: Send + Sync {
    /// Returns the snapped path for `points`. An empty result means that no
    /// road matched, e.g. because the rider is off the named road network.
    async fn snap(&self, points: &[Coordinate]) -> Result<Vec<Coordinate>>;
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Returns a human readable address for `coordinate`.
    async fn reverse_geocode(&self, coordinate: &Coordinate) -> Result<String>;
}

#[async_trait]
pub trait FuelUpdater: Send + Sync {
    /// Reports the derived fuel level in percent for a motor.
    ///
    /// Implementations must reject non finite or out of range levels with
    /// [`common::error::Error::Validation`] without contacting the service.
    async fn update_fuel_level(&self, motor_id: &str, fuel_level: f64) -> Result<()>;
}

#[async_trait]
pub trait TripRepository: Send + Sync {
    /// Persists a finished trip and returns its identifier.
    async fn save_trip(&self, summary: &TripSummary) -> Result<String>;
}

/// Read access to the collections mirrored by the domain store.
#[async_trait]
pub trait DomainApi: Send + Sync {
    async fn fetch_reports(&self, user_id: &str) -> Result<Vec<Report>>;

    async fn fetch_stations(&self, user_id: &str) -> Result<Vec<GasStation>>;

    async fn fetch_motors(&self, user_id: &str) -> Result<Vec<Motor>>;

    /// Returns `None` if the backend has no profile for the user.
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
}
