//! Liveness endpoints.
//!
//! Neither handler touches the data store, so both stay green while MongoDB is down.

use axum::Json;
use serde::Serialize;

use crate::config::SERVICE_NAME;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct Pong {
    pub message: &'static str,
}

/// Health check handler.
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        service: SERVICE_NAME,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Ping handler for monitoring.
pub async fn ping() -> Json<Pong> {
    Json(Pong { message: "pong" })
}
