//! # Priey Studio Server
//!
//! Local HTTP front for a single design-document session. The browser editor
//! talks to it for import, drag-and-drop, export, language and page changes;
//! the session itself lives in `studio-core`.
//!
//! The server binds to localhost only. An optional shared password gates the
//! `/api` routes (see [`auth`]).

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod health;
pub mod routes;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use studio_core::{MemoryEngine, Session, SessionStorage};
use tokio::sync::Mutex;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub use auth::AccessGate;
pub use config::ServerConfig;

/// The session shared by all handlers.
pub type SharedSession = Arc<Mutex<Session<MemoryEngine>>>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The document session.
    pub session: SharedSession,
    /// Password gate for `/api`.
    pub gate: AccessGate,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wrap a session, its password gate and the upload limit.
    #[must_use]
    pub fn new(
        session: Session<MemoryEngine>,
        password: Option<String>,
        max_upload_bytes: usize,
    ) -> Self {
        let storage: Arc<dyn SessionStorage> = Arc::clone(session.storage());
        Self {
            session: Arc::new(Mutex::new(session)),
            gate: AccessGate::new(password, storage),
            max_upload_bytes,
        }
    }
}

/// Build the application router. CORS is left to the caller.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/session", get(routes::get_session))
        .route("/api/document", get(routes::get_document))
        .route("/api/document/new", post(routes::new_document))
        .route("/api/document/import", post(routes::import_document))
        .route("/api/document/drop", post(routes::drop_files))
        .route("/api/document/export", get(routes::export_document))
        .route("/api/language", put(routes::set_language))
        .route("/api/page/active", put(routes::set_active_page))
        .route_layer(middleware::from_fn_with_state(
            state.gate.clone(),
            auth::require_access,
        ));

    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .merge(protected)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.max_upload_bytes))
        // Request ID for log correlation
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
