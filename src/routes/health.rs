/**
 * Health Routes
 * Process uptime and database connectivity
 */
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::ConnectionState;
use crate::state::AppState;

/// Upper bound on computing the report.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Seconds since the server started.
    pub uptime: u64,
    pub timestamp: DateTime<Utc>,
    pub database: ConnectionState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthErrorResponse {
    pub status: String,
    pub message: String,
}

/// GET /_health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match tokio::time::timeout(HEALTH_TIMEOUT, state.store.connection_state()).await
    {
        Ok(database) => database,
        Err(_) => {
            tracing::error!("health check timed out");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthErrorResponse {
                    status: "error".to_string(),
                    message: "Health check timed out".to_string(),
                }),
            )
                .into_response();
        }
    };

    let (code, status) = match database {
        ConnectionState::Connected => (StatusCode::OK, "ok"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };

    let response = HealthResponse {
        status: status.to_string(),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
        database,
    };
    (code, Json(response)).into_response()
}
