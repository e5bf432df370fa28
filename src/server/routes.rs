//! Liveness route handlers.
//!
//! Both endpoints are stateless and answer 200 for as long as the process
//! serves requests, regardless of what the scheduler is doing.

use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub ok: bool,
}

/// GET /
pub async fn index() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "Bot is running!".to_string(),
    })
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}
