//! Access gate.
//!
//! A single shared password guards the editor API. Passing the gate stores an
//! `authorized` flag in durable storage, so the browser stays unlocked across
//! restarts until it logs out. Without a configured password the gate is open.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use studio_core::storage::{is_authorized, set_authorized};
use studio_core::SessionStorage;

use crate::routes::ApiError;
use crate::AppState;

/// Password check backed by the session store.
#[derive(Debug, Clone)]
pub struct AccessGate {
    password: Option<Arc<str>>,
    storage: Arc<dyn SessionStorage>,
}

impl AccessGate {
    /// Create a gate; `None` disables it.
    #[must_use]
    pub fn new(password: Option<String>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            password: password.filter(|p| !p.is_empty()).map(Arc::from),
            storage,
        }
    }

    /// Whether a password is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    /// Whether requests may pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored flag cannot be read.
    pub async fn is_open(&self) -> Result<bool, ApiError> {
        if !self.is_enabled() {
            return Ok(true);
        }
        Ok(is_authorized(self.storage.as_ref()).await?)
    }

    /// Check a password and record the result.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] on a wrong password.
    pub async fn login(&self, password: &str) -> Result<(), ApiError> {
        if let Some(expected) = &self.password {
            if password != expected.as_ref() {
                tracing::warn!("Rejected login attempt");
                return Err(ApiError::Unauthorized);
            }
        }
        set_authorized(self.storage.as_ref(), true).await?;
        tracing::info!("Access granted");
        Ok(())
    }

    /// Clear the stored flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the flag cannot be cleared.
    pub async fn logout(&self) -> Result<(), ApiError> {
        set_authorized(self.storage.as_ref(), false).await?;
        tracing::info!("Access revoked");
        Ok(())
    }
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Submitted password.
    pub password: String,
}

/// Gate state returned by login/logout.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Whether the API is unlocked.
    pub authorized: bool,
}

/// `POST /api/auth/login`
#[tracing::instrument(name = "login", skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    state.gate.login(&request.password).await?;
    Ok(Json(AuthResponse { authorized: true }))
}

/// `POST /api/auth/logout`
#[tracing::instrument(name = "logout", skip(state))]
pub async fn logout(State(state): State<AppState>) -> Result<Json<AuthResponse>, ApiError> {
    state.gate.logout().await?;
    Ok(Json(AuthResponse {
        authorized: !state.gate.is_enabled(),
    }))
}

/// Middleware rejecting requests until the gate is passed.
pub async fn require_access(
    State(gate): State<AccessGate>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if gate.is_open().await? {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::MemoryStorage;

    #[tokio::test]
    async fn test_open_gate_without_password() {
        let gate = AccessGate::new(None, Arc::new(MemoryStorage::new()));
        assert!(!gate.is_enabled());
        assert!(gate.is_open().await.expect("open"));
    }

    #[tokio::test]
    async fn test_empty_password_disables_gate() {
        let gate = AccessGate::new(Some(String::new()), Arc::new(MemoryStorage::new()));
        assert!(!gate.is_enabled());
    }

    #[tokio::test]
    async fn test_login_logout_cycle() {
        let gate = AccessGate::new(Some("s3cret".into()), Arc::new(MemoryStorage::new()));
        assert!(!gate.is_open().await.expect("read"));

        assert!(matches!(gate.login("wrong").await, Err(ApiError::Unauthorized)));
        assert!(!gate.is_open().await.expect("read"));

        gate.login("s3cret").await.expect("login");
        assert!(gate.is_open().await.expect("read"));

        gate.logout().await.expect("logout");
        assert!(!gate.is_open().await.expect("read"));
    }
}
