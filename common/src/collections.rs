// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Records of the collections mirrored by the domain store, besides motors.

use crate::position::Coordinate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A road report submitted by a rider (traffic, hazard, closure, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub report_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<Coordinate>,
    #[serde(default)]
    pub timestamp_ms: Option<i64>,
}

/// A point of interest where fuel can be bought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasStation {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub location: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Names of the collections held by the domain store.
///
/// The name is also part of the persistent storage key of the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionName {
    Reports,
    Stations,
    Motors,
    Profile,
}

impl CollectionName {
    pub const ALL: [CollectionName; 4] = [
        CollectionName::Reports,
        CollectionName::Stations,
        CollectionName::Motors,
        CollectionName::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Reports => "reports",
            CollectionName::Stations => "stations",
            CollectionName::Motors => "motors",
            CollectionName::Profile => "profile",
        }
    }

    /// Key of the persisted JSON blob of this collection for `user_id`.
    pub fn storage_key(&self, user_id: &str) -> String {
        format!("cache_{}_{}", self.as_str(), user_id)
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of an invalidation: one collection or every collection of the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionSelector {
    One(CollectionName),
    All,
}

impl CollectionSelector {
    pub fn names(&self) -> Vec<CollectionName> {
        match self {
            CollectionSelector::One(name) => vec![*name],
            CollectionSelector::All => CollectionName::ALL.to_vec(),
        }
    }
}

impl From<CollectionName> for CollectionSelector {
    fn from(name: CollectionName) -> Self {
        CollectionSelector::One(name)
    }
}
