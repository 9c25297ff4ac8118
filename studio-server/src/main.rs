//! # Priey Studio
//!
//! Local server for the Priey Design Studio editor.
//! Binds to localhost only.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use studio_core::{FsStorage, Session};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use studio_server::{build_router, AppState, ServerConfig};

/// Build a CORS layer that only allows localhost origins.
fn build_cors_layer(port: u16) -> CorsLayer {
    let localhost_origins = [
        format!("http://localhost:{port}"),
        format!("http://127.0.0.1:{port}"),
        // Editor dev server
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ];

    let origins: Vec<HeaderValue> = localhost_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION])
        .allow_credentials(true)
}

/// Initialize structured tracing.
///
/// `RUST_LOG` controls levels; `RUST_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,studio_server=debug,studio_core=debug,tower_http=debug")
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::parse();
    let storage = FsStorage::open(config.data_dir.clone()).await?;
    tracing::info!("Session data in {:?}", storage.data_dir());

    let mut session = Session::in_memory(Arc::new(storage), config.session_config());
    let loaded = session.first_load().await;
    tracing::info!("First load: {loaded:?}");

    if config.password.is_some() {
        tracing::info!("Access gate enabled");
    }
    let state = AppState::new(session, config.password.clone(), config.max_upload_bytes);
    let shared = Arc::clone(&state.session);

    let app = build_router(state).layer(build_cors_layer(config.port));

    // Bind to localhost ONLY
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Priey Studio server starting on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let mut session = shared.lock().await;
    if let Err(e) = session.persist().await {
        tracing::warn!("Final persist failed: {e}");
    }
    session.close();

    Ok(())
}
