// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

/// Aggregated usage numbers the backend keeps per motor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MotorAnalytics {
    /// Total distance in kilometers.
    pub total_distance: f64,
    pub trips_completed: u64,
    pub total_fuel_used: f64,
}

/// A user vehicle ("motor") as mirrored from the backend.
///
/// The backend owns the record. Locally it is only changed by the fuel level
/// derivation of the trip tracker, which applies an optimistic patch that the
/// next successful refresh of the motors collection replaces.
///
/// # Example
///
/// ```rust
/// use common::vehicle::Motor;
///
/// let motor = Motor::new("m-1", "Daily", 80.0, Some(250.0));
/// assert!(motor.has_drivable_range());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Motor {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub nickname: String,
    /// Fuel level in percent, `0..=100`.
    #[serde(default)]
    pub current_fuel_level: f64,
    #[serde(default)]
    pub total_drivable_distance_km: Option<f64>,
    #[serde(default)]
    pub analytics: MotorAnalytics,
}

impl Motor {
    pub fn new(
        id: &str,
        nickname: &str,
        current_fuel_level: f64,
        total_drivable_distance_km: Option<f64>,
    ) -> Self {
        Motor {
            id: id.to_string(),
            nickname: nickname.to_string(),
            current_fuel_level,
            total_drivable_distance_km,
            analytics: MotorAnalytics::default(),
        }
    }

    /// Returns `true` if a usable drivable range is known, i.e. a fuel level
    /// can be derived from traveled distance.
    pub fn has_drivable_range(&self) -> bool {
        matches!(self.total_drivable_distance_km, Some(range) if range.is_finite() && range > 0.0)
    }

    /// Applies an optimistic patch and returns the patched copy.
    pub fn patched(&self, patch: &MotorPatch) -> Motor {
        let mut motor = self.clone();
        if let Some(level) = patch.current_fuel_level {
            motor.current_fuel_level = level;
        }
        if let Some(nickname) = &patch.nickname {
            motor.nickname = nickname.clone();
        }
        motor
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Partial update of a [`Motor`] applied locally before the backend confirms it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorPatch {
    pub current_fuel_level: Option<f64>,
    pub nickname: Option<String>,
}

impl MotorPatch {
    pub fn fuel_level(level: f64) -> Self {
        MotorPatch {
            current_fuel_level: Some(level),
            nickname: None,
        }
    }

    /// Combines two patches, fields set in `newer` win.
    pub fn merge(&self, newer: &MotorPatch) -> MotorPatch {
        MotorPatch {
            current_fuel_level: newer.current_fuel_level.or(self.current_fuel_level),
            nickname: newer.nickname.clone().or_else(|| self.nickname.clone()),
        }
    }
}
