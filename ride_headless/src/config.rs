// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use anyhow::{Context, Result};
use api::ApiConfig;
use common::position::Coordinate;
use domain_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::{io::Read, path::Path, str::FromStr};
use tracing::debug;
use trip_tracker::TrackerConfig;

/// Configuration file of the headless runner.
///
/// ```json
/// {
///   "api": { "base_url": "https://ride.example.com/api" },
///   "store": { "stale_after_ms": 30000 },
///   "tracker": { "snap_batch_size": 20 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub tracker: TrackerConfig,
}

impl RunnerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid runner configuration")
    }

    /// Loads the configuration file, the defaults apply without a file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(RunnerConfig::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// Reads `longitude,latitude` rows following a header line.
pub fn read_waypoints<R: Read>(reader: R) -> Result<Vec<Coordinate>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut waypoints = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let field = |index: usize| -> Result<f64> {
            let value = record
                .get(index)
                .with_context(|| format!("Row {} has no column {}", line + 1, index + 1))?;
            f64::from_str(value.trim())
                .with_context(|| format!("Row {} has an invalid number '{}'", line + 1, value))
        };
        let longitude = field(0)?;
        let latitude = field(1)?;
        waypoints.push(Coordinate::new(latitude, longitude));
    }
    debug!("length of waypoints: {}", waypoints.len());
    Ok(waypoints)
}

pub fn read_waypoints_from_file(path: &Path) -> Result<Vec<Coordinate>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open route file {}", path.display()))?;
    read_waypoints(file)
}
