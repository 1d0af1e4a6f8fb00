// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Error taxonomy shared by the tracker, the domain store and the API client.

use thiserror::Error;

/// Core error type of the ride tracker.
///
/// Degraded results (empty snapping output, geocoding fallback, skipped fuel
/// update) are not represented here. They are reported as events and never
/// abort the running operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// An operation was invoked in the wrong lifecycle phase,
    /// e.g. `start()` while a ride is already tracked.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed input, e.g. a non finite fuel level. Never sent over the network.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network or timeout failure that may succeed when retried.
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// The service answered with a non retryable failure.
    #[error("Service error (status {status}): {message}")]
    PersistentService { status: u16, message: String },

    /// The service rejected the bearer token or no token was present.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Reading or writing the persistent key-value storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientNetwork(msg.into())
    }

    pub fn service(status: u16, msg: impl Into<String>) -> Self {
        Self::PersistentService {
            status,
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Returns `true` if the failure belongs to the transient class and the
    /// operation may be retried with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransientNetwork(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
