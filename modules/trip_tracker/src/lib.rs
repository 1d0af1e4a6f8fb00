// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Trip Tracker Modul for the ride tracker
//!
//! Turns a stream of raw location samples into ride statistics, a road
//! snapped route, fuel level estimates and finally a persisted trip summary.

pub mod config;
mod module;
pub mod throttle;
mod tracker;

pub use config::TrackerConfig;
pub use module::TripTrackerModule;
pub use throttle::Throttle;
pub use tracker::{SnapOutcome, TrackerServices, TripTracker};

#[cfg(test)]
mod tests;
