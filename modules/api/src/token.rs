// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::sync::{Arc, RwLock};
use storage::KeyValueStorage;
use tracing::{debug, warn};

/// Storage key the bearer token is persisted under by the sign-in flow.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Source of the bearer token attached to authenticated requests.
///
/// The in-memory token wins. Without one the token is read from the persistent
/// storage and kept in memory for the following requests. If neither holds a
/// token the request goes out unauthenticated and the service decides whether
/// to reject it.
pub struct AuthTokenSource {
    token: RwLock<Option<String>>,
    storage: Option<Arc<dyn KeyValueStorage>>,
}

impl AuthTokenSource {
    pub fn new(storage: Option<Arc<dyn KeyValueStorage>>) -> Self {
        AuthTokenSource {
            token: RwLock::new(None),
            storage,
        }
    }

    pub fn with_token(token: &str) -> Self {
        AuthTokenSource {
            token: RwLock::new(Some(token.to_string())),
            storage: None,
        }
    }

    /// Replaces the in-memory token, `None` forgets it.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub async fn token(&self) -> Option<String> {
        if let Some(token) = self
            .token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Some(token);
        }
        let storage = self.storage.as_ref()?;
        match storage.get(AUTH_TOKEN_KEY).await {
            Ok(Some(token)) if !token.trim().is_empty() => {
                debug!("Loaded bearer token from persistent storage");
                let token = token.trim().to_string();
                self.set_token(Some(token.clone()));
                Some(token)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read bearer token from storage. Error: {}", e);
                None
            }
        }
    }
}
