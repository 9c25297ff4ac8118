//! Health check endpoints.
//!
//! - `/health/live` - the process is up
//! - `/health/ready` - a document is loaded and storage answers
//! - `/health` - alias of readiness

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use studio_core::{SessionStatus, SessionStorage, StorageKey};

use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
    /// Individual component checks
    pub checks: HealthChecks,
}

/// Individual health checks.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// The session has finished its first load.
    pub session: bool,
    /// Durable storage can be read.
    pub storage: bool,
}

impl HealthChecks {
    fn all_ok(&self) -> bool {
        self.session && self.storage
    }
}

/// Liveness probe.
#[tracing::instrument(name = "liveness_probe")]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe.
///
/// An `error` session still counts as ready: the previous document stays
/// editable and the user can retry.
#[tracing::instrument(name = "readiness_probe", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let session = state.session.lock().await;
    let session_ok = matches!(
        session.status(),
        SessionStatus::Ready | SessionStatus::Error
    );
    let storage_ok = match session.storage().get(StorageKey::Language).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Storage check failed: {e}");
            false
        }
    };
    drop(session);

    let checks = HealthChecks {
        session: session_ok,
        storage: storage_ok,
    };
    let code = if checks.all_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthStatus {
            status: if checks.all_ok() { "healthy" } else { "unhealthy" },
            version: env!("CARGO_PKG_VERSION"),
            checks,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus {
            status: "healthy",
            version: "0.2.0",
            checks: HealthChecks {
                session: true,
                storage: true,
            },
        };

        let json = serde_json::to_value(&status).expect("should serialize");
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["checks"]["session"], true);
        assert_eq!(json["checks"]["storage"], true);
    }

    #[test]
    fn test_any_failed_check_is_unhealthy() {
        let checks = HealthChecks {
            session: true,
            storage: false,
        };
        assert!(!checks.all_ok());
    }
}
