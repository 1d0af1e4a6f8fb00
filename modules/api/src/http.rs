// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    ApiConfig, AuthTokenSource, DomainApi, FuelUpdater, ReverseGeocoder, RoadSnapper,
    TripRepository,
};
use async_trait::async_trait;
use common::{
    collections::{GasStation, Report, UserProfile},
    error::{Error, Result},
    position::Coordinate,
    trip::TripSummary,
    vehicle::Motor,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FuelUpdateRequest<'a> {
    motor_id: &'a str,
    fuel_level: f64,
}

#[derive(Serialize)]
struct SnapRequest<'a> {
    points: &'a [Coordinate],
}

#[derive(Deserialize)]
struct SnapResponse {
    #[serde(default)]
    points: Vec<Coordinate>,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    address: Option<String>,
}

#[derive(Deserialize)]
struct SaveTripResponse {
    #[serde(alias = "_id", alias = "tripId")]
    id: String,
}

/// Maps a non success HTTP status to the error taxonomy.
///
/// 5xx, 408 and 429 are transient, 401 and 403 are authorization failures and
/// every other status is a persistent service failure.
pub fn classify_status(status: StatusCode, body: &str) -> Error {
    let message = if body.is_empty() {
        status.to_string()
    } else {
        body.to_string()
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => Error::transient(message),
        s if s.is_server_error() => Error::transient(message),
        s => Error::service(s.as_u16(), message),
    }
}

fn classify_transport_error(e: reqwest::Error) -> Error {
    if e.is_decode() {
        Error::Serialization(e.to_string())
    } else {
        // timeouts, refused connections and broken bodies
        Error::transient(e.to_string())
    }
}

/// HTTP implementation of all remote collaborators.
///
/// Authenticated requests carry `Authorization: Bearer <token>` from the
/// [`AuthTokenSource`]. Every request is bounded by the configured timeout.
pub struct HttpApiClient {
    client: reqwest::Client,
    config: ApiConfig,
    tokens: Arc<AuthTokenSource>,
}

impl HttpApiClient {
    pub fn new(config: ApiConfig, tokens: Arc<AuthTokenSource>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::invalid_state(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpApiClient {
            client,
            config,
            tokens,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match self.tokens.token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.map_err(classify_transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let error = classify_status(status, &body);
        warn!("Request failed with status {}. Error: {}", status, error);
        Err(error)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self.send(self.client.get(url)).await?;
        response.json::<T>().await.map_err(classify_transport_error)
    }
}

#[async_trait]
impl RoadSnapper for HttpApiClient {
    async fn snap(&self, points: &[Coordinate]) -> Result<Vec<Coordinate>> {
        let url = self.config.snap_url();
        debug!("POST {} with {} points", url, points.len());
        let response = self
            .send(self.client.post(&url).json(&SnapRequest { points }))
            .await?;
        let snapped = response
            .json::<SnapResponse>()
            .await
            .map_err(classify_transport_error)?;
        Ok(snapped
            .points
            .into_iter()
            .filter(Coordinate::is_valid)
            .collect())
    }
}

#[async_trait]
impl ReverseGeocoder for HttpApiClient {
    async fn reverse_geocode(&self, coordinate: &Coordinate) -> Result<String> {
        let url = self.config.geocode_url();
        let response = self
            .send(self.client.get(&url).query(&[
                ("lat", coordinate.latitude),
                ("lon", coordinate.longitude),
            ]))
            .await?;
        let geocode = response
            .json::<GeocodeResponse>()
            .await
            .map_err(classify_transport_error)?;
        Ok(geocode.address.unwrap_or_default())
    }
}

#[async_trait]
impl FuelUpdater for HttpApiClient {
    async fn update_fuel_level(&self, motor_id: &str, fuel_level: f64) -> Result<()> {
        let fuel_level = algorithm::validate_fuel_level(fuel_level)?;
        let url = self.config.url("fuel/update");
        debug!("POST {} motor {} level {:.2}", url, motor_id, fuel_level);
        self.send(self.client.post(&url).json(&FuelUpdateRequest {
            motor_id,
            fuel_level,
        }))
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TripRepository for HttpApiClient {
    async fn save_trip(&self, summary: &TripSummary) -> Result<String> {
        let url = self.config.url("trips");
        debug!("POST {} for motor {}", url, summary.motor_id);
        let response = self.send(self.client.post(&url).json(summary)).await?;
        let saved = response
            .json::<SaveTripResponse>()
            .await
            .map_err(classify_transport_error)?;
        Ok(saved.id)
    }
}

#[async_trait]
impl DomainApi for HttpApiClient {
    async fn fetch_reports(&self, user_id: &str) -> Result<Vec<Report>> {
        let url = self.config.url("reports");
        debug!("GET {} for user {}", url, user_id);
        let response = self
            .send(self.client.get(&url).query(&[("userId", user_id)]))
            .await?;
        response
            .json::<Vec<Report>>()
            .await
            .map_err(classify_transport_error)
    }

    async fn fetch_stations(&self, _user_id: &str) -> Result<Vec<GasStation>> {
        self.get_json(&self.config.url("gas-stations")).await
    }

    async fn fetch_motors(&self, user_id: &str) -> Result<Vec<Motor>> {
        self.get_json(&self.config.url(&format!("motors/user/{}", user_id)))
            .await
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let url = self.config.url(&format!("users/{}/profile", user_id));
        match self.get_json::<UserProfile>(&url).await {
            Ok(profile) => Ok(Some(profile)),
            Err(Error::PersistentService { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
