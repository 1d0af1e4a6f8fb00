// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

/// Endpoints and transport settings of the HTTP API client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. `https://ride.example.com/api`.
    pub base_url: String,
    /// Road snapping endpoint. Defaults to `<base_url>/roads/snap`.
    pub snap_url: Option<String>,
    /// Reverse geocoding endpoint. Defaults to `<base_url>/geocode/reverse`.
    pub geocode_url: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://localhost:3000/api".to_string(),
            snap_url: None,
            geocode_url: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    /// Joins `path` to the base URL, tolerating duplicate slashes.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn snap_url(&self) -> String {
        self.snap_url
            .clone()
            .unwrap_or_else(|| self.url("roads/snap"))
    }

    pub fn geocode_url(&self) -> String {
        self.geocode_url
            .clone()
            .unwrap_or_else(|| self.url("geocode/reverse"))
    }
}
