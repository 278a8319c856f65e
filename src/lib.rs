//! Blog Backend - library for app logic and testing

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod media;
pub mod routes;
pub mod state;

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, cors::CorsLayer,
    limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::auth::JwtAuthenticator;
use crate::config::{AppConfig, ConfigError};
use crate::db::PgStore;
use crate::error::MessageResponse;
use crate::logging::LogSettings;
use crate::media::{CloudinaryHost, MediaError};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("image host client: {0}")]
    Media(#[from] MediaError),

    #[error("invalid listen address {0}")]
    Address(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, falling back to
/// the local frontend dev server.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        MessageResponse::new("Something went wrong!"),
    )
        .into_response()
}

/// Create and configure the application router.
pub fn create_app(state: AppState, max_body_bytes: usize) -> Router {
    let cors = configure_cors();

    routes::router(state)
        // Multipart and JSON extractors default to 2 MB; image uploads need more.
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(cors)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init(&LogSettings::from_env());

    let config = AppConfig::from_env().inspect_err(|e| {
        tracing::error!("invalid configuration: {}", e);
    })?;

    let store = Arc::new(PgStore::new(db::init_pool(&config.db)?));
    if let Err(e) = store.migrate().await {
        // The pool keeps retrying; /_health reports the state meanwhile.
        tracing::error!("Failed to run database migrations: {}", e);
    }

    let images = Arc::new(CloudinaryHost::new(config.cloudinary.clone())?);
    let auth = Arc::new(JwtAuthenticator::new(&config.jwt));
    let state = AppState::new(store.clone(), images, auth);
    let app = create_app(state, config.max_body_bytes);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| StartupError::Address(format!("{}:{}", config.host, config.port)))?;
    tracing::info!(environment = %config.environment, "Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    store.close().await;
    tracing::info!("server stopped");
    Ok(())
}
